//! In-memory implementation of the StoreView trait.
//!
//! Same semantics as SQLite with no persistence. Also stands in for the
//! replication layer in tests: [`MemoryStore::apply_remote`] injects writes
//! that arrive from a peer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::{
    validate_key, MutationNotifier, MutationOrigin, MutationSubscription, PutResult, StoreView,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Bytes>>,
    notifier: MutationNotifier,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            notifier: MutationNotifier::new(),
        }
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a write that arrived from a peer.
    pub fn apply_remote(&self, key: &str, blob: Bytes) -> Result<PutResult> {
        self.apply_remote_batch(vec![(key.to_string(), blob)])
            .map(|mut results| results.pop().unwrap_or(PutResult::Unchanged))
    }

    /// Apply several peer writes and report them as one mutation.
    pub fn apply_remote_batch(&self, writes: Vec<(String, Bytes)>) -> Result<Vec<PutResult>> {
        for (key, _) in &writes {
            validate_key(key)?;
        }

        let mut changed = Vec::new();
        let mut results = Vec::with_capacity(writes.len());
        {
            let mut entries = self.write()?;
            for (key, blob) in writes {
                let result = upsert(&mut entries, &key, blob);
                if result.is_mutation() {
                    changed.push(key);
                }
                results.push(result);
            }
        }

        debug!(changed = changed.len(), "applied remote batch");
        self.notifier.notify(changed, MutationOrigin::Remote);
        Ok(results)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Bytes>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Bytes>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }
}

fn upsert(entries: &mut BTreeMap<String, Bytes>, key: &str, blob: Bytes) -> PutResult {
    match entries.get(key) {
        Some(existing) if *existing == blob => PutResult::Unchanged,
        Some(_) => {
            entries.insert(key.to_string(), blob);
            PutResult::Overwritten
        }
        None => {
            entries.insert(key.to_string(), blob);
            PutResult::Inserted
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreView for MemoryStore {
    async fn put(&self, key: &str, blob: Bytes) -> Result<PutResult> {
        validate_key(key)?;

        let result = {
            let mut entries = self.write()?;
            upsert(&mut entries, key, blob)
        };

        if result.is_mutation() {
            self.notifier
                .notify(vec![key.to_string()], MutationOrigin::Local);
        }
        Ok(result)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.read()?.get(key).cloned())
    }

    async fn list_keys(&self) -> Result<BTreeSet<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn subscribe(&self) -> MutationSubscription {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryStore::new();
        let result = store.put("a/1", Bytes::from_static(b"one")).await.unwrap();
        assert_eq!(result, PutResult::Inserted);
        assert_eq!(
            store.get("a/1").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_idempotent() {
        let store = MemoryStore::new();
        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        let again = store.put("k", Bytes::from_static(b"v")).await.unwrap();
        assert_eq!(again, PutResult::Unchanged);
        let other = store.put("k", Bytes::from_static(b"w")).await.unwrap();
        assert_eq!(other, PutResult::Overwritten);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let store = MemoryStore::new();
        let err = store.put("", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_list_keys_sorted() {
        let store = MemoryStore::new();
        for key in ["c", "a", "b"] {
            store.put(key, Bytes::from_static(b"x")).await.unwrap();
        }
        let keys: Vec<_> = store.list_keys().await.unwrap().into_iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_local_put_notifies_once() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe();

        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        store.put("k", Bytes::from_static(b"v")).await.unwrap();

        let m = sub.recv().await.unwrap();
        assert_eq!(m.keys, vec!["k".to_string()]);
        assert_eq!(m.origin, MutationOrigin::Local);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_remote_batch_is_one_mutation() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe();

        let results = store
            .apply_remote_batch(vec![
                ("r/1".into(), Bytes::from_static(b"1")),
                ("r/2".into(), Bytes::from_static(b"2")),
            ])
            .unwrap();
        assert_eq!(results, vec![PutResult::Inserted, PutResult::Inserted]);

        let m = sub.recv().await.unwrap();
        assert_eq!(m.keys.len(), 2);
        assert_eq!(m.origin, MutationOrigin::Remote);
    }

    #[tokio::test]
    async fn test_remote_batch_rejects_invalid_key_atomically() {
        let store = MemoryStore::new();
        let err = store
            .apply_remote_batch(vec![
                ("ok".into(), Bytes::from_static(b"1")),
                ("".into(), Bytes::from_static(b"2")),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(store.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_reapplying_same_blob_is_unchanged(
                key in "[a-z]{1,8}/[0-9]{1,4}",
                blob in prop::collection::vec(any::<u8>(), 0..64),
            ) {
                let store = MemoryStore::new();
                let blob = Bytes::from(blob);
                prop_assert_eq!(store.apply_remote(&key, blob.clone()).unwrap(), PutResult::Inserted);
                prop_assert_eq!(store.apply_remote(&key, blob).unwrap(), PutResult::Unchanged);
                prop_assert_eq!(store.len(), 1);
            }
        }
    }
}
