//! Bridge: the running ingestion side of feedcast.
//!
//! Owns the entry cache, the channel registry, and the coordinator task.
//! Poll adapters talk to it only through the [`PollObserver`] it hands out.

use std::sync::Arc;

use feedcast_ingest::{
    BridgeConfig, ChannelRegistry, Coordinator, CoordinatorMonitor, CoordinatorPhase,
    CoordinatorStats, EntryCache, FeedConfig, PollObserver, RetentionConfig, RetentionPolicy,
    StoreResolver,
};
use feedcast_store::{PrefixedStore, StoreView};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{FeedcastError, Result};

/// Places every feed under its own `<name>/` namespace of the resolved store.
struct NamespacedResolver<'a> {
    inner: &'a dyn StoreResolver,
}

impl StoreResolver for NamespacedResolver<'_> {
    fn resolve(&self, feed: &FeedConfig) -> feedcast_ingest::Result<Arc<dyn StoreView>> {
        let shared = self.inner.resolve(feed)?;
        Ok(Arc::new(PrefixedStore::new(shared, &feed.name)?))
    }
}

/// A running ingestion bridge.
pub struct Bridge {
    cache: Arc<EntryCache>,
    registry: Arc<ChannelRegistry>,
    monitor: Arc<CoordinatorMonitor>,
    coordinator: JoinHandle<()>,
}

impl Bridge {
    /// Register the configured channels and start the coordinator.
    ///
    /// Each feed's entries land under `<feed name>/` in the store its target
    /// resolves to. Channels that fail to register are logged and skipped.
    /// Must be called from within a tokio runtime.
    pub fn start(config: &BridgeConfig, resolver: &dyn StoreResolver) -> Self {
        let registry = ChannelRegistry::from_config(config, &NamespacedResolver { inner: resolver });
        Self::with_registry(registry, &config.retention)
    }

    /// Start with a prepared registry, e.g. with adapter-owned item lists.
    pub fn with_registry(registry: ChannelRegistry, retention: &RetentionConfig) -> Self {
        let cache = Arc::new(EntryCache::new());
        let registry = Arc::new(registry);
        let coordinator = Coordinator::new(
            cache.clone(),
            registry.clone(),
            RetentionPolicy::new(retention),
        );
        let monitor = coordinator.monitor();

        info!(
            channels = registry.len(),
            retained = retention.retained_count,
            "bridge started"
        );

        Self {
            cache,
            registry,
            monitor,
            coordinator: coordinator.spawn(),
        }
    }

    /// Callback surface for poll adapters.
    pub fn observer(&self) -> PollObserver {
        PollObserver::new(self.cache.clone(), self.registry.clone())
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    pub fn phase(&self) -> CoordinatorPhase {
        self.monitor.phase()
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.monitor.stats()
    }

    /// Close the cache, let the coordinator finish what is pending, and
    /// wait for it.
    pub async fn shutdown(self) -> Result<CoordinatorStats> {
        self.cache.close();
        self.coordinator
            .await
            .map_err(|e| FeedcastError::Task(e.to_string()))?;
        let stats = self.monitor.stats();
        info!(?stats, "bridge stopped");
        Ok(stats)
    }
}
