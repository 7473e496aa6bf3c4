//! StoreView trait: the narrow interface to the replicated key space.
//!
//! The replication subsystem owns the key space; feedcast only writes
//! entries, reads them back, and listens for mutations. Implementations
//! include an in-memory store (tests, single node), SQLite (local
//! persistence), and a prefixing adapter for per-feed namespaces.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::{Result, StoreError};

/// Capacity of the mutation broadcast channel.
const MUTATION_CHANNEL_CAPACITY: usize = 256;

/// Result of writing a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// Key did not exist before.
    Inserted,
    /// Key existed with different bytes and was replaced.
    Overwritten,
    /// Key existed with identical bytes (idempotent, not an error).
    Unchanged,
}

impl PutResult {
    /// Whether the write changed the key set contents.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, PutResult::Unchanged)
    }
}

/// Where a mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOrigin {
    /// Written through this node's store view.
    Local,
    /// Received from a peer by the replication layer.
    Remote,
}

/// Notification that some keys changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMutation {
    /// Keys that changed. Empty when the subscriber fell behind and the
    /// concrete keys were lost; subscribers must treat that as "anything
    /// may have changed".
    pub keys: Vec<String>,
    pub origin: MutationOrigin,
}

impl StoreMutation {
    pub fn new(keys: Vec<String>, origin: MutationOrigin) -> Self {
        Self { keys, origin }
    }

    /// Whether the concrete key list was lost.
    pub fn is_lagged(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The StoreView trait: async interface to the key space.
///
/// # Design Notes
///
/// - **Idempotent puts**: writing identical bytes to an existing key
///   returns `Unchanged` and does not notify subscribers.
/// - **No deletes**: the key set only grows from feedcast's side.
/// - **At-least-once notification**: every batch of changes produces at
///   least one [`StoreMutation`]; there is no ordering guarantee.
#[async_trait]
pub trait StoreView: Send + Sync {
    /// Write a blob under a key.
    async fn put(&self, key: &str, blob: Bytes) -> Result<PutResult>;

    /// Read the blob stored under a key.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// List every key currently in the store, sorted.
    async fn list_keys(&self) -> Result<BTreeSet<String>>;

    /// Subscribe to mutation notifications.
    fn subscribe(&self) -> MutationSubscription;
}

#[async_trait]
impl<S: StoreView + ?Sized> StoreView for Arc<S> {
    async fn put(&self, key: &str, blob: Bytes) -> Result<PutResult> {
        (**self).put(key, blob).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn list_keys(&self) -> Result<BTreeSet<String>> {
        (**self).list_keys().await
    }

    fn subscribe(&self) -> MutationSubscription {
        (**self).subscribe()
    }
}

/// Reject keys no backend can hold.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Sending half of the mutation broadcast, owned by a store implementation.
#[derive(Debug, Clone)]
pub struct MutationNotifier {
    tx: broadcast::Sender<StoreMutation>,
}

impl MutationNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a mutation. No-op for an empty key list or no subscribers.
    pub fn notify(&self, keys: Vec<String>, origin: MutationOrigin) {
        if keys.is_empty() {
            return;
        }
        // Err only means nobody is listening right now.
        let _ = self.tx.send(StoreMutation::new(keys, origin));
    }

    pub fn subscribe(&self) -> MutationSubscription {
        MutationSubscription::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MutationNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a store's mutation notifications.
///
/// Optionally scoped to key prefixes: keys outside the scope are dropped and
/// the prefix is stripped from the rest.
#[derive(Debug)]
pub struct MutationSubscription {
    rx: broadcast::Receiver<StoreMutation>,
    /// Applied in order, outermost store last.
    prefixes: Vec<String>,
}

impl MutationSubscription {
    fn new(rx: broadcast::Receiver<StoreMutation>) -> Self {
        Self {
            rx,
            prefixes: Vec::new(),
        }
    }

    /// Scope this subscription to keys under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Wait for the next mutation.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn recv(&mut self) -> Option<StoreMutation> {
        loop {
            match self.rx.recv().await {
                Ok(mutation) => {
                    if let Some(scoped) = self.scope(mutation) {
                        return Some(scoped);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "mutation subscriber lagged; reporting full change");
                    return Some(StoreMutation::new(Vec::new(), MutationOrigin::Remote));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<StoreMutation> {
        loop {
            match self.rx.try_recv() {
                Ok(mutation) => {
                    if let Some(scoped) = self.scope(mutation) {
                        return Some(scoped);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Some(StoreMutation::new(Vec::new(), MutationOrigin::Remote));
                }
                Err(_) => return None,
            }
        }
    }

    fn scope(&self, mutation: StoreMutation) -> Option<StoreMutation> {
        if self.prefixes.is_empty() {
            return Some(mutation);
        }
        let keys: Vec<String> = mutation
            .keys
            .into_iter()
            .filter_map(|key| {
                self.prefixes.iter().try_fold(key, |key, prefix| {
                    key.strip_prefix(prefix.as_str()).map(str::to_string)
                })
            })
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(StoreMutation::new(keys, mutation.origin))
        }
    }
}
