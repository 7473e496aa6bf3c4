//! Callback surface handed to poll adapters.

use std::fmt::Display;
use std::sync::Arc;

use feedcast_core::{ChannelId, Entry};
use tracing::{debug, error, warn};

use crate::cache::EntryCache;
use crate::registry::ChannelRegistry;

/// Receives discovered items and channel errors from poll adapters.
///
/// Cheap to clone; every adapter can hold its own copy.
#[derive(Clone)]
pub struct PollObserver {
    cache: Arc<EntryCache>,
    registry: Arc<ChannelRegistry>,
}

impl PollObserver {
    pub fn new(cache: Arc<EntryCache>, registry: Arc<ChannelRegistry>) -> Self {
        Self { cache, registry }
    }

    /// Admission filter: adapters may call this before fetching item bodies.
    pub fn can_admit(&self, channel: &ChannelId, entry: &Entry) -> bool {
        self.cache.can_admit(channel, entry.published_at)
    }

    /// An adapter found an item on a channel.
    ///
    /// Admitted items are added to the channel's item list and queued for
    /// upload. Returns whether the item was admitted.
    pub fn item_found(&self, channel: ChannelId, entry: Entry) -> bool {
        let Some(binding) = self.registry.get(&channel) else {
            warn!(%channel, "item for unregistered channel ignored");
            return false;
        };

        if !self.can_admit(&channel, &entry) {
            debug!(%channel, published_at = entry.published_at, "item at or below threshold");
            return false;
        }

        if self.cache.is_closed() {
            warn!(%channel, "entry cache closed; item dropped");
            return false;
        }

        let known = binding.items.items().contains(&entry);
        if !known {
            binding.items.add(entry.clone());
        }
        if self.cache.observe(channel, entry.clone()) {
            return true;
        }
        // Closed in between: never queued, so it must not count towards
        // retention either.
        if !known {
            binding.items.remove(std::slice::from_ref(&entry));
        }
        false
    }

    /// An adapter failed to poll a channel. Logged only.
    pub fn channel_errored(&self, channel: ChannelId, err: &dyn Display) {
        match self.registry.get(&channel) {
            Some(binding) => error!(
                %channel,
                feed = %binding.feed_name,
                source = %binding.source_url,
                error = %err,
                "poll failed"
            ),
            None => error!(%channel, error = %err, "poll failed for unregistered channel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemList, MemoryItemList};
    use feedcast_store::{MemoryStore, StoreView};

    fn setup() -> (PollObserver, Arc<EntryCache>, ChannelId, Arc<MemoryItemList>) {
        let mut registry = ChannelRegistry::new();
        let items = Arc::new(MemoryItemList::new());
        let store: Arc<dyn StoreView> = Arc::new(MemoryStore::new());
        let channel = registry
            .register("tech", "http://a.example/rss", store, items.clone())
            .unwrap();
        let cache = Arc::new(EntryCache::new());
        (
            PollObserver::new(cache.clone(), Arc::new(registry)),
            cache,
            channel,
            items,
        )
    }

    #[test]
    fn test_item_found_queues_and_records() {
        let (observer, cache, channel, items) = setup();
        assert!(observer.item_found(channel, Entry::new("a", "", "", 10)));
        assert_eq!(cache.pending_len(), 1);
        assert_eq!(items.items().len(), 1);
    }

    #[test]
    fn test_item_below_threshold_rejected() {
        let (observer, cache, channel, items) = setup();
        cache.raise_threshold(channel, 10);

        assert!(!observer.item_found(channel, Entry::new("old", "", "", 10)));
        assert!(observer.item_found(channel, Entry::new("new", "", "", 11)));
        assert_eq!(cache.pending_len(), 1);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unregistered_channel_ignored() {
        let (observer, cache, _, _) = setup();
        let stray = ChannelId::derive("other", "http://x");
        assert!(!observer.item_found(stray, Entry::new("a", "", "", 1)));
        observer.channel_errored(stray, &"connection refused");
        assert_eq!(cache.pending_len(), 0);
    }

    #[test]
    fn test_item_after_close_not_recorded() {
        let (observer, cache, channel, items) = setup();
        assert!(observer.item_found(channel, Entry::new("kept", "", "", 1)));
        cache.close();

        assert!(!observer.item_found(channel, Entry::new("late", "", "", 2)));
        assert!(!observer.item_found(channel, Entry::new("kept", "", "", 1)));
        assert_eq!(items.items(), vec![Entry::new("kept", "", "", 1)]);
    }
}
