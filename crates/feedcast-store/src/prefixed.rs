//! Namespacing adapter: one feed's view of a shared key space.
//!
//! Every key written through a [`PrefixedStore`] lands under `<prefix>/`;
//! listing and subscriptions only see keys in that namespace, with the
//! prefix stripped.

use std::collections::BTreeSet;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{MutationSubscription, PutResult, StoreView};

/// A store view scoped to `<prefix>/`.
pub struct PrefixedStore<S> {
    inner: S,
    /// Includes the trailing separator.
    prefix: String,
}

impl<S: StoreView> PrefixedStore<S> {
    /// Scope `inner` to `prefix`. The prefix must be non-empty and must not
    /// contain `/`.
    pub fn new(inner: S, prefix: &str) -> Result<Self> {
        if prefix.is_empty() || prefix.contains('/') {
            return Err(StoreError::InvalidKey(prefix.to_string()));
        }
        Ok(Self {
            inner,
            prefix: format!("{}/", prefix),
        })
    }

    /// The namespace, without the trailing separator.
    pub fn prefix(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn full_key(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(format!("{}{}", self.prefix, key))
    }
}

#[async_trait]
impl<S: StoreView> StoreView for PrefixedStore<S> {
    async fn put(&self, key: &str, blob: Bytes) -> Result<PutResult> {
        let full = self.full_key(key)?;
        self.inner.put(&full, blob).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let full = self.full_key(key)?;
        self.inner.get(&full).await
    }

    async fn list_keys(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .inner
            .list_keys()
            .await?
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.prefix.as_str()).map(str::to_string))
            .collect())
    }

    fn subscribe(&self) -> MutationSubscription {
        self.inner.subscribe().with_prefix(self.prefix.clone())
    }
}
