//! The regeneration engine.
//!
//! Every store mutation triggers a full rebuild: list all keys, decode every
//! entry, build the document from scratch, publish it. Rebuilds never patch
//! a previous document, so two rebuilds over the same key set publish the
//! same bytes, and concurrent rebuilds simply race to publish
//! (last writer wins).

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use feedcast_core::{decode_entry, ChannelMeta, DocumentItem, OutputDocument};
use feedcast_store::{MutationSubscription, StoreView};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::freshness::{Freshness, FreshnessTracker, UpdateTicket};
use crate::observers::{Observer, ObserverId, ObserverSet};
use crate::sink::DocumentSink;

/// Summary of one successful rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Keys listed from the store.
    pub keys: usize,
    /// Entries that made it into the document.
    pub decoded: usize,
    /// Keys whose blobs could not be read or decoded.
    pub skipped: Vec<String>,
}

/// Rebuilds and publishes one feed's output document.
pub struct RegenerationEngine {
    store: Arc<dyn StoreView>,
    meta: ChannelMeta,
    sink: Arc<dyn DocumentSink>,
    freshness: FreshnessTracker,
    observers: ObserverSet,
    current: RwLock<Option<Arc<OutputDocument>>>,
}

impl RegenerationEngine {
    pub fn new(store: Arc<dyn StoreView>, meta: ChannelMeta, sink: Arc<dyn DocumentSink>) -> Self {
        Self {
            store,
            meta,
            sink,
            freshness: FreshnessTracker::new(),
            observers: ObserverSet::default(),
            current: RwLock::new(None),
        }
    }

    pub fn meta(&self) -> &ChannelMeta {
        &self.meta
    }

    pub fn store(&self) -> &Arc<dyn StoreView> {
        &self.store
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness.snapshot()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.freshness.snapshot().last_update
    }

    pub fn refreshed_since_update(&self) -> bool {
        self.freshness.snapshot().refreshed_since_update
    }

    /// The most recently published document, if any.
    pub fn current_document(&self) -> Option<Arc<OutputDocument>> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(Option<DateTime<Utc>>, &RegenerationEngine) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let observer: Arc<Observer> = Arc::new(observer);
        self.observers.add(observer)
    }

    /// Returns whether the observer was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// React to a store mutation.
    ///
    /// `changed` is informational only; the rebuild always covers the full
    /// key set. Observers are notified whether or not the rebuild succeeds.
    pub async fn on_store_mutated(&self, changed: &[String]) -> Result<RebuildReport> {
        let ticket = self.freshness.mark_updated(Utc::now());
        debug!(feed = %self.meta.title, changed = changed.len(), "store mutated");
        self.regenerate(ticket).await
    }

    /// Rebuild on request, without recording a new update time.
    pub async fn force_update(&self) -> Result<RebuildReport> {
        self.regenerate(self.freshness.current()).await
    }

    async fn regenerate(&self, ticket: UpdateTicket) -> Result<RebuildReport> {
        let result = self.rebuild().await;
        match &result {
            Ok(report) => {
                self.freshness.mark_refreshed(ticket);
                info!(
                    feed = %self.meta.title,
                    keys = report.keys,
                    entries = report.decoded,
                    skipped = report.skipped.len(),
                    "feed regenerated"
                );
            }
            Err(e) => error!(feed = %self.meta.title, error = %e, "feed regeneration failed"),
        }

        self.observers.notify(ticket.last_update(), self);
        result
    }

    /// Build the document from the current key set and publish it.
    async fn rebuild(&self) -> Result<RebuildReport> {
        let keys = self.store.list_keys().await?;
        let mut report = RebuildReport {
            keys: keys.len(),
            ..Default::default()
        };

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let blob = match self.store.get(&key).await {
                Ok(Some(blob)) => blob,
                Ok(None) => {
                    debug!(key = %key, "key vanished during rebuild");
                    report.skipped.push(key);
                    continue;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "could not read entry");
                    report.skipped.push(key);
                    continue;
                }
            };

            match decode_entry(&blob) {
                Ok(entry) => items.push(DocumentItem { key, entry }),
                Err(e) => {
                    warn!(key = %key, error = %e, "could not decode entry");
                    report.skipped.push(key);
                }
            }
        }

        let document = Arc::new(OutputDocument::build(self.meta.clone(), items));
        report.decoded = document.len();
        self.sink.publish(&document).await?;

        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(document);
        Ok(report)
    }

    /// Rebuild on every mutation until the store goes away.
    pub async fn listen(self: Arc<Self>, mut subscription: MutationSubscription) {
        while let Some(mutation) = subscription.recv().await {
            // Errors are already logged and reflected in freshness.
            let _ = self.on_store_mutated(&mutation.keys).await;
        }
        debug!(feed = %self.meta.title, "mutation stream closed");
    }

    /// Subscribe now and rebuild on every mutation in a background task.
    ///
    /// The subscription is taken before the task starts, so no mutation
    /// after this call is missed.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let subscription = self.store.subscribe();
        tokio::spawn(self.clone().listen(subscription))
    }

    /// Like [`spawn_listener`](Self::spawn_listener), but publish the
    /// current key set once before waiting for mutations, so a store that
    /// was populated before this call is published right away.
    pub fn spawn_publisher(self: &Arc<Self>) -> JoinHandle<()> {
        let subscription = self.store.subscribe();
        let engine = self.clone();
        tokio::spawn(async move {
            // Errors are already logged and reflected in freshness.
            let _ = engine.force_update().await;
            engine.listen(subscription).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use bytes::Bytes;
    use feedcast_core::{encode_entry, Entry};
    use feedcast_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingSink;

    #[async_trait]
    impl DocumentSink for FailingSink {
        async fn publish(&self, _document: &OutputDocument) -> Result<()> {
            Err(crate::error::RegenError::Publish("disk full".into()))
        }
    }

    async fn put_entry(store: &MemoryStore, entry: &Entry) {
        let key = entry.key().unwrap();
        store
            .put(key.as_str(), Bytes::from(encode_entry(entry).unwrap()))
            .await
            .unwrap();
    }

    fn engine(store: Arc<MemoryStore>, sink: Arc<dyn DocumentSink>) -> Arc<RegenerationEngine> {
        Arc::new(RegenerationEngine::new(
            store,
            ChannelMeta::new("tech", "technology news"),
            sink,
        ))
    }

    #[tokio::test]
    async fn test_rebuild_includes_all_entries() {
        let store = Arc::new(MemoryStore::new());
        put_entry(&store, &Entry::new("a", "", "", 1_000)).await;
        put_entry(&store, &Entry::new("b", "", "", 2_000)).await;

        let sink = Arc::new(MemorySink::new());
        let engine = engine(store, sink.clone());
        let report = engine.on_store_mutated(&[]).await.unwrap();

        assert_eq!(report.decoded, 2);
        assert!(engine.refreshed_since_update());
        assert!(engine.last_update().is_some());
        let doc = engine.current_document().unwrap();
        assert_eq!(doc.items()[0].entry.title, "b");
        assert_eq!(sink.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_key_skipped() {
        let store = Arc::new(MemoryStore::new());
        put_entry(&store, &Entry::new("good", "", "", 1_000)).await;
        store
            .put("2011-01-01_00-00-00/corrupt", Bytes::from_static(b"\x00garbage"))
            .await
            .unwrap();

        let engine = engine(store, Arc::new(MemorySink::new()));
        let report = engine.on_store_mutated(&[]).await.unwrap();

        assert_eq!(report.keys, 2);
        assert_eq!(report.decoded, 1);
        assert_eq!(report.skipped, vec!["2011-01-01_00-00-00/corrupt".to_string()]);
        assert!(engine.refreshed_since_update());
    }

    #[tokio::test]
    async fn test_rebuild_is_deterministic() {
        let store = Arc::new(MemoryStore::new());
        put_entry(&store, &Entry::new("a", "x", "http://a", 1_000)).await;
        let sink = Arc::new(MemorySink::new());
        let engine = engine(store, sink.clone());

        engine.force_update().await.unwrap();
        let first = sink.latest().unwrap();
        engine.force_update().await.unwrap();
        assert_eq!(sink.latest().unwrap(), first);
    }

    #[tokio::test]
    async fn test_force_update_keeps_last_update() {
        let engine = engine(Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));
        engine.force_update().await.unwrap();
        assert_eq!(engine.last_update(), None);
        assert!(engine.refreshed_since_update());
        assert!(engine.current_document().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_flag_false_and_notifies() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store, Arc::new(FailingSink));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        engine.add_observer(move |ts, _| {
            assert!(ts.is_some());
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(engine.on_store_mutated(&[]).await.is_err());
        assert!(!engine.refreshed_since_update());
        assert!(engine.last_update().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_observer_does_not_block_others() {
        let engine = engine(Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        engine.add_observer(|_, _| anyhow::bail!("observer broke"));
        let seen = calls.clone();
        engine.add_observer(move |_, engine| {
            assert!(engine.refreshed_since_update());
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        engine.force_update().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_observer() {
        let engine = engine(Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = engine.add_observer(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(engine.remove_observer(id));
        assert!(!engine.remove_observer(id));
        engine.force_update().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_listener_rebuilds_on_remote_write() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MemorySink::new());
        let engine = engine(store.clone(), sink.clone());
        let listener = engine.spawn_listener();

        let entry = Entry::new("replicated", "", "", 5_000);
        store
            .apply_remote(
                entry.key().unwrap().as_str(),
                Bytes::from(encode_entry(&entry).unwrap()),
            )
            .unwrap();

        for _ in 0..100 {
            if engine.current_document().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(engine.current_document().unwrap().len(), 1);
        assert_eq!(sink.publish_count(), 1);
        listener.abort();
    }

    async fn wait_for_len(engine: &RegenerationEngine, len: usize) -> bool {
        for _ in 0..100 {
            if engine.current_document().is_some_and(|doc| doc.len() == len) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_panicking_observer_keeps_listener_alive() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone(), Arc::new(MemorySink::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let panicking = engine.add_observer(|_, _| panic!("observer exploded"));
        let seen = calls.clone();
        engine.add_observer(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let listener = engine.spawn_listener();

        put_entry(&store, &Entry::new("a", "", "", 1_000)).await;
        assert!(wait_for_len(&engine, 1).await);
        engine.remove_observer(panicking);

        put_entry(&store, &Entry::new("b", "", "", 2_000)).await;
        assert!(wait_for_len(&engine, 2).await);
        assert!(!listener.is_finished());
        assert!(calls.load(Ordering::SeqCst) >= 2);
        listener.abort();
    }

    #[tokio::test]
    async fn test_publisher_publishes_existing_entries() {
        let store = Arc::new(MemoryStore::new());
        put_entry(&store, &Entry::new("before start", "", "", 1_000)).await;
        let sink = Arc::new(MemorySink::new());
        let engine = engine(store.clone(), sink.clone());

        let publisher = engine.spawn_publisher();
        assert!(wait_for_len(&engine, 1).await);
        assert!(engine.refreshed_since_update());
        assert_eq!(engine.last_update(), None);

        put_entry(&store, &Entry::new("after start", "", "", 2_000)).await;
        assert!(wait_for_len(&engine, 2).await);
        assert!(engine.last_update().is_some());
        publisher.abort();
    }
}
