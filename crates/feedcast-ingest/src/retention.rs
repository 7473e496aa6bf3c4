//! Retention policy: keep a bounded window of the newest items per channel.
//!
//! Everything past the window is removed from the channel's item list, and
//! the newest pruned timestamp becomes the channel's admission threshold.

use std::cmp::Ordering;

use feedcast_core::{ChannelId, Entry};
use tracing::debug;

use crate::cache::EntryCache;
use crate::config::RetentionConfig;
use crate::items::ItemList;

/// What a retention pass did to one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionOutcome {
    /// Items removed from the channel's list.
    pub pruned: usize,
    /// Timestamp of the first pruned item, if anything was pruned.
    pub boundary: Option<i64>,
    /// Whether the channel's threshold moved.
    pub threshold_raised: bool,
}

/// Applies [`RetentionConfig`] to channel item lists.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    retained_count: usize,
}

impl RetentionPolicy {
    pub fn new(config: &RetentionConfig) -> Self {
        Self {
            retained_count: config.retained_count,
        }
    }

    pub fn retained_count(&self) -> usize {
        self.retained_count
    }

    /// Split items into (retained, pruned), both newest first.
    pub fn partition(&self, mut items: Vec<Entry>) -> (Vec<Entry>, Vec<Entry>) {
        items.sort_by(newest_first);
        if items.len() <= self.retained_count {
            return (items, Vec::new());
        }
        let pruned = items.split_off(self.retained_count);
        (items, pruned)
    }

    /// Run one retention pass over a channel's full item list.
    pub fn apply(
        &self,
        channel: ChannelId,
        items: &dyn ItemList,
        cache: &EntryCache,
    ) -> RetentionOutcome {
        let (_, pruned) = self.partition(items.items());
        let Some(boundary) = pruned.first().map(|e| e.published_at) else {
            return RetentionOutcome::default();
        };

        items.remove(&pruned);
        let threshold_raised = cache.raise_threshold(channel, boundary);

        debug!(
            %channel,
            pruned = pruned.len(),
            boundary,
            threshold_raised,
            "retention applied"
        );

        RetentionOutcome {
            pruned: pruned.len(),
            boundary: Some(boundary),
            threshold_raised,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(&RetentionConfig::default())
    }
}

// Ties on timestamp are broken by title so the split is deterministic.
fn newest_first(a: &Entry, b: &Entry) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.title.cmp(&a.title))
}
