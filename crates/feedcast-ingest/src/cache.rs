//! Entry cache: the single shared boundary between poll adapters and the
//! upload coordinator.
//!
//! Producers append entries per channel; the consumer removes the whole
//! pending batch of one channel at a time. The retention threshold of every
//! channel lives behind the same lock, so admission checks and threshold
//! updates never interleave with a half-finished drain.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use feedcast_core::{ChannelId, Entry};
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Shared, lock-protected pending entries and thresholds.
pub struct EntryCache {
    state: Mutex<CacheState>,
    ready: Notify,
}

#[derive(Default)]
struct CacheState {
    /// Only non-empty batches are kept.
    pending: HashMap<ChannelId, Vec<Entry>>,
    /// Unix ms; items at or below are already observed.
    thresholds: HashMap<ChannelId, i64>,
    closed: bool,
}

impl CacheState {
    fn take_any(&mut self) -> Option<(ChannelId, Vec<Entry>)> {
        let channel = *self.pending.keys().next()?;
        self.pending.remove(&channel).map(|entries| (channel, entries))
    }
}

impl EntryCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ready: Notify::new(),
        }
    }

    // Lock only guards plain collections, so a panic elsewhere cannot leave
    // them half-updated.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry to the channel's pending batch and wake a waiter.
    ///
    /// Returns `false` if the cache is closed and the entry was dropped.
    pub fn observe(&self, channel: ChannelId, entry: Entry) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                warn!(%channel, title = %entry.title, "entry cache closed; dropping entry");
                return false;
            }
            state.pending.entry(channel).or_default().push(entry);
        }
        trace!(%channel, "entry observed");
        self.ready.notify_one();
        true
    }

    /// Remove and return the whole pending batch of some channel, waiting
    /// until one exists.
    ///
    /// Which channel is served first is unspecified. After [`close`], any
    /// remaining batches are still handed out, then `None` is returned.
    ///
    /// [`close`]: Self::close
    pub async fn drain_any(&self) -> Option<(ChannelId, Vec<Entry>)> {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent observe/close is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(batch) = state.take_any() {
                    return Some(batch);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Non-waiting variant of [`drain_any`](Self::drain_any).
    pub fn try_drain(&self) -> Option<(ChannelId, Vec<Entry>)> {
        self.lock().take_any()
    }

    /// Whether an item with this timestamp may enter the channel.
    pub fn can_admit(&self, channel: &ChannelId, published_at: i64) -> bool {
        match self.lock().thresholds.get(channel) {
            Some(threshold) => published_at > *threshold,
            None => true,
        }
    }

    pub fn threshold(&self, channel: &ChannelId) -> Option<i64> {
        self.lock().thresholds.get(channel).copied()
    }

    /// Move the channel's threshold forward. Lower values are ignored.
    ///
    /// Returns whether the threshold changed.
    pub fn raise_threshold(&self, channel: ChannelId, threshold: i64) -> bool {
        let mut state = self.lock();
        match state.thresholds.get(&channel) {
            Some(current) if *current >= threshold => false,
            _ => {
                state.thresholds.insert(channel, threshold);
                true
            }
        }
    }

    /// Number of entries waiting across all channels.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.values().map(Vec::len).sum()
    }

    /// Stop accepting entries and release idle waiters.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new()
    }
}
