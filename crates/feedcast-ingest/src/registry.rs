//! Channel registry: which feed, source, store, and item list each channel
//! maps to.
//!
//! Built once from [`BridgeConfig`]. A channel whose setup is invalid is
//! logged and left out; the rest of the feeds still register.

use std::collections::HashMap;
use std::sync::Arc;

use feedcast_core::ChannelId;
use feedcast_store::StoreView;
use tracing::{error, info};

use crate::config::{BridgeConfig, FeedConfig};
use crate::error::{IngestError, Result};
use crate::items::{ItemList, MemoryItemList};

/// Resolves a feed's store target into a store view.
///
/// Implemented by the host, which knows how targets map to backends.
pub trait StoreResolver {
    fn resolve(&self, feed: &FeedConfig) -> Result<Arc<dyn StoreView>>;
}

impl<F> StoreResolver for F
where
    F: Fn(&FeedConfig) -> Result<Arc<dyn StoreView>>,
{
    fn resolve(&self, feed: &FeedConfig) -> Result<Arc<dyn StoreView>> {
        self(feed)
    }
}

/// Everything the coordinator needs to upload one channel's entries.
pub struct ChannelBinding {
    pub id: ChannelId,
    pub feed_name: String,
    pub source_url: String,
    pub store: Arc<dyn StoreView>,
    pub items: Arc<dyn ItemList>,
}

impl std::fmt::Debug for ChannelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("id", &self.id)
            .field("feed_name", &self.feed_name)
            .field("source_url", &self.source_url)
            .finish_non_exhaustive()
    }
}

/// Lookup from channel ID to binding.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelId, Arc<ChannelBinding>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every valid channel named by `config`.
    pub fn from_config(config: &BridgeConfig, resolver: &dyn StoreResolver) -> Self {
        let mut registry = Self::new();

        for feed in &config.feeds {
            if let Err(e) = validate_feed_name(&feed.name) {
                error!(feed = %feed.name, error = %e, "skipping feed");
                continue;
            }

            let store = match resolver.resolve(feed) {
                Ok(store) => store,
                Err(e) => {
                    error!(
                        feed = %feed.name,
                        target = %feed.target,
                        error = %e,
                        "skipping feed: store target unusable"
                    );
                    continue;
                }
            };

            for source in &feed.sources {
                let items = Arc::new(MemoryItemList::new());
                match registry.register(&feed.name, source, store.clone(), items) {
                    Ok(id) => {
                        info!(feed = %feed.name, source = %source, channel = %id, "channel registered")
                    }
                    Err(e) => {
                        error!(feed = %feed.name, source = %source, error = %e, "skipping source")
                    }
                }
            }
        }

        registry
    }

    /// Register one channel. Re-registering the same (feed, source) replaces
    /// the previous binding.
    pub fn register(
        &mut self,
        feed_name: &str,
        source_url: &str,
        store: Arc<dyn StoreView>,
        items: Arc<dyn ItemList>,
    ) -> Result<ChannelId> {
        validate_feed_name(feed_name)?;
        validate_source_url(feed_name, source_url)?;

        let id = ChannelId::derive(feed_name, source_url);
        self.channels.insert(
            id,
            Arc::new(ChannelBinding {
                id,
                feed_name: feed_name.to_string(),
                source_url: source_url.to_string(),
                store,
                items,
            }),
        );
        Ok(id)
    }

    pub fn get(&self, id: &ChannelId) -> Option<Arc<ChannelBinding>> {
        self.channels.get(id).cloned()
    }

    /// Channel of a (feed, source) pair, if registered.
    pub fn lookup(&self, feed_name: &str, source_url: &str) -> Option<Arc<ChannelBinding>> {
        self.get(&ChannelId::derive(feed_name, source_url))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Arc<ChannelBinding>> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

fn validate_feed_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('/') {
        return Err(IngestError::InvalidChannel {
            feed: name.to_string(),
            reason: "feed name must be non-empty and must not contain '/'".into(),
        });
    }
    Ok(())
}

fn validate_source_url(feed: &str, url: &str) -> Result<()> {
    let valid = match url.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && !rest.is_empty()
        }
        None => false,
    };
    if !valid {
        return Err(IngestError::InvalidChannel {
            feed: feed.to_string(),
            reason: format!("invalid source URL {:?}", url),
        });
    }
    Ok(())
}
