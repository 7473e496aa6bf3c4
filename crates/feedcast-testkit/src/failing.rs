//! Fault injection: a store wrapper whose puts fail on demand.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use feedcast_store::{MutationSubscription, PutResult, Result, StoreError, StoreView};

type KeyPredicate = dyn Fn(&str) -> bool + Send + Sync;

/// Wraps a store and fails every put whose key matches a predicate.
///
/// Reads and subscriptions pass through untouched.
pub struct FailingStore<S> {
    inner: S,
    should_fail: Box<KeyPredicate>,
    attempts: AtomicUsize,
    failures: AtomicUsize,
}

impl<S: StoreView> FailingStore<S> {
    pub fn new<F>(inner: S, should_fail: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            should_fail: Box::new(should_fail),
            attempts: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Fail every put.
    pub fn always(inner: S) -> Self {
        Self::new(inner, |_| true)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Puts attempted, failed or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: StoreView> StoreView for FailingStore<S> {
    async fn put(&self, key: &str, blob: Bytes) -> Result<PutResult> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if (self.should_fail)(key) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Backend(format!("injected failure for {}", key)));
        }
        self.inner.put(key, blob).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn list_keys(&self) -> Result<BTreeSet<String>> {
        self.inner.list_keys().await
    }

    fn subscribe(&self) -> MutationSubscription {
        self.inner.subscribe()
    }
}
