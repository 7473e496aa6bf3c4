//! Upload coordinator: the single consumer of the entry cache.
//!
//! Cycle per batch: IDLE (waiting on the cache) → DRAINING (retention over
//! the channel's full item list) → UPLOADING (encode and put each entry) →
//! IDLE. Per-entry failures are logged and counted; nothing is retried.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use feedcast_core::{encode_entry, ChannelId, Entry};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::EntryCache;
use crate::error::Result;
use crate::registry::{ChannelBinding, ChannelRegistry};
use crate::retention::{RetentionOutcome, RetentionPolicy};

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoordinatorPhase {
    Idle = 0,
    Draining = 1,
    Uploading = 2,
    /// The cache was closed and fully drained.
    Stopped = 3,
}

impl CoordinatorPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => CoordinatorPhase::Draining,
            2 => CoordinatorPhase::Uploading,
            3 => CoordinatorPhase::Stopped,
            _ => CoordinatorPhase::Idle,
        }
    }
}

/// Cumulative counters since the coordinator was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub batches: u64,
    /// Successful puts, including idempotent re-uploads.
    pub uploaded: u64,
    pub failed: u64,
    /// Invalid entries that were never encoded.
    pub skipped: u64,
}

/// Result of processing one drained batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub uploaded: usize,
    /// Puts that found identical bytes already stored.
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    pub retention: RetentionOutcome,
}

/// Read-only view of a running coordinator.
#[derive(Debug, Default)]
pub struct CoordinatorMonitor {
    phase: AtomicU8,
    batches: AtomicU64,
    uploaded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl CoordinatorMonitor {
    pub fn phase(&self) -> CoordinatorPhase {
        CoordinatorPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            batches: self.batches.load(Ordering::Relaxed),
            uploaded: self.uploaded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn set_phase(&self, phase: CoordinatorPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn record(&self, report: &BatchReport) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.uploaded
            .fetch_add(report.uploaded as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        self.skipped
            .fetch_add(report.skipped as u64, Ordering::Relaxed);
    }
}

/// Drains the entry cache and uploads to each channel's store.
pub struct Coordinator {
    cache: Arc<EntryCache>,
    registry: Arc<ChannelRegistry>,
    retention: RetentionPolicy,
    monitor: Arc<CoordinatorMonitor>,
}

impl Coordinator {
    pub fn new(
        cache: Arc<EntryCache>,
        registry: Arc<ChannelRegistry>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            cache,
            registry,
            retention,
            monitor: Arc::new(CoordinatorMonitor::default()),
        }
    }

    pub fn monitor(&self) -> Arc<CoordinatorMonitor> {
        self.monitor.clone()
    }

    /// Run on a dedicated task until the cache is closed and empty.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process batches until the cache is closed and empty.
    pub async fn run(self) {
        info!(channels = self.registry.len(), "coordinator started");

        while let Some((channel, entries)) = self.cache.drain_any().await {
            self.process_batch(channel, entries).await;
        }

        self.monitor.set_phase(CoordinatorPhase::Stopped);
        info!(stats = ?self.monitor.stats(), "coordinator stopped");
    }

    /// Handle one drained batch and return to IDLE.
    pub async fn process_batch(&self, channel: ChannelId, entries: Vec<Entry>) -> BatchReport {
        let mut report = BatchReport::default();

        let Some(binding) = self.registry.get(&channel) else {
            warn!(%channel, count = entries.len(), "dropping batch for unregistered channel");
            report.failed = entries.len();
            self.finish(&report);
            return report;
        };

        self.monitor.set_phase(CoordinatorPhase::Draining);
        report.retention = self
            .retention
            .apply(channel, binding.items.as_ref(), &self.cache);

        self.monitor.set_phase(CoordinatorPhase::Uploading);
        for entry in &entries {
            if !entry.is_valid() {
                debug!(%channel, link = %entry.link, "skipping entry without title");
                report.skipped += 1;
                continue;
            }

            match upload(&binding, entry).await {
                Ok(true) => report.uploaded += 1,
                Ok(false) => {
                    report.uploaded += 1;
                    report.unchanged += 1;
                }
                Err(e) => {
                    error!(
                        %channel,
                        feed = %binding.feed_name,
                        title = %entry.title,
                        error = %e,
                        "upload failed"
                    );
                    report.failed += 1;
                }
            }
        }

        debug!(
            %channel,
            feed = %binding.feed_name,
            uploaded = report.uploaded,
            failed = report.failed,
            skipped = report.skipped,
            "batch complete"
        );
        self.finish(&report);
        report
    }

    fn finish(&self, report: &BatchReport) {
        self.monitor.record(report);
        self.monitor.set_phase(CoordinatorPhase::Idle);
    }
}

/// Encode and put one entry. Returns whether the store changed.
async fn upload(binding: &ChannelBinding, entry: &Entry) -> Result<bool> {
    let key = entry.key()?;
    let blob = encode_entry(entry)?;
    let result = binding.store.put(key.as_str(), Bytes::from(blob)).await?;
    Ok(result.is_mutation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemList, MemoryItemList};
    use feedcast_core::decode_entry;
    use feedcast_store::{MemoryStore, StoreView};
    use feedcast_testkit::FailingStore;

    struct Fixture {
        cache: Arc<EntryCache>,
        coordinator: Coordinator,
        channel: ChannelId,
        store: Arc<dyn StoreView>,
        items: Arc<MemoryItemList>,
    }

    fn fixture(store: Arc<dyn StoreView>) -> Fixture {
        let items = Arc::new(MemoryItemList::new());
        let mut registry = ChannelRegistry::new();
        let channel = registry
            .register("tech", "http://a.example/rss", store.clone(), items.clone())
            .unwrap();
        let cache = Arc::new(EntryCache::new());
        let coordinator = Coordinator::new(
            cache.clone(),
            Arc::new(registry),
            RetentionPolicy::default(),
        );
        Fixture {
            cache,
            coordinator,
            channel,
            store,
            items,
        }
    }

    #[tokio::test]
    async fn test_batch_uploads_decodable_entries() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let entry = Entry::new("hello", "world", "http://a.example/1", 1_300_000_000_000);

        let report = f
            .coordinator
            .process_batch(f.channel, vec![entry.clone()])
            .await;
        assert_eq!(report.uploaded, 1);

        let key = entry.key().unwrap();
        let blob = f.store.get(key.as_str()).await.unwrap().unwrap();
        assert_eq!(decode_entry(&blob).unwrap(), entry);
        assert_eq!(f.coordinator.monitor().phase(), CoordinatorPhase::Idle);
    }

    #[tokio::test]
    async fn test_reupload_is_unchanged() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let entry = Entry::new("same", "", "", 5_000);
        f.coordinator.process_batch(f.channel, vec![entry.clone()]).await;
        let report = f.coordinator.process_batch(f.channel, vec![entry]).await;
        assert_eq!(report.unchanged, 1);
        assert_eq!(f.store.list_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entries_skipped() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let report = f
            .coordinator
            .process_batch(
                f.channel,
                vec![Entry::new("", "no title", "", 1), Entry::new("ok", "", "", 2)],
            )
            .await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.uploaded, 1);
        assert_eq!(f.coordinator.monitor().stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_put_failure_skips_only_that_entry() {
        let failing = Entry::new("doomed", "", "", 2_000);
        let doomed_key = failing.key().unwrap().into_string();
        let store = Arc::new(FailingStore::new(MemoryStore::new(), move |key: &str| {
            key == doomed_key
        }));
        let f = fixture(store.clone());

        let report = f
            .coordinator
            .process_batch(
                f.channel,
                vec![
                    Entry::new("first", "", "", 1_000),
                    failing,
                    Entry::new("third", "", "", 3_000),
                ],
            )
            .await;

        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.attempts(), 3);
        assert_eq!(f.store.list_keys().await.unwrap().len(), 2);
        assert_eq!(f.coordinator.monitor().phase(), CoordinatorPhase::Idle);
    }

    #[tokio::test]
    async fn test_retention_runs_before_upload() {
        let f = fixture(Arc::new(MemoryStore::new()));
        for ts in 1..=7 {
            f.items.add(Entry::new(format!("item {}", ts), "", "", ts * 1_000));
        }

        let report = f
            .coordinator
            .process_batch(f.channel, vec![Entry::new("item 7", "", "", 7_000)])
            .await;
        assert_eq!(report.retention.pruned, 2);
        assert_eq!(f.cache.threshold(&f.channel), Some(2_000));
        assert_eq!(f.items.len(), 5);
    }

    #[tokio::test]
    async fn test_run_stops_after_close() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let monitor = f.coordinator.monitor();
        f.cache.observe(f.channel, Entry::new("a", "", "", 1));
        f.cache.close();

        f.coordinator.spawn().await.unwrap();
        assert_eq!(monitor.phase(), CoordinatorPhase::Stopped);
        assert_eq!(monitor.stats().batches, 1);
        assert_eq!(monitor.stats().uploaded, 1);
    }

    #[tokio::test]
    async fn test_unregistered_channel_batch_counts_as_failed() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let stray = ChannelId::derive("other", "http://x");
        let report = f
            .coordinator
            .process_batch(stray, vec![Entry::new("a", "", "", 1)])
            .await;
        assert_eq!(report.failed, 1);
    }
}
