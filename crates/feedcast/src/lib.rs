//! # Feedcast
//!
//! Republish syndicated feeds through an eventually-consistent,
//! peer-replicated key/value store.
//!
//! ## Overview
//!
//! Two independent pipelines meet at the store:
//!
//! - **Ingestion** ([`Bridge`]): poll adapters report items; the newest few
//!   per source are encoded and written under `<feed>/<timestamp>/<hash>`.
//! - **Regeneration** ([`FeedReader`]): every mutation of a feed's keys,
//!   local or replicated in, rebuilds the feed's RSS document from scratch
//!   and publishes it atomically.
//!
//! Replication itself is external; any [`StoreView`] will do. A
//! [`FeedManager`] runs one reader per configured feed over a shared store.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feedcast::{Bridge, BridgeConfig, FeedConfig, FeedReader, ReaderConfig};
//! use feedcast::store::{MemoryStore, StoreView};
//!
//! async fn example() -> feedcast::Result<()> {
//!     let shared: Arc<dyn StoreView> = Arc::new(MemoryStore::new());
//!
//!     let reader = FeedReader::namespaced(
//!         ReaderConfig::new("tech", "/var/www").with_description("technology news"),
//!         shared.clone(),
//!     )?;
//!     reader.start();
//!
//!     let config = BridgeConfig::default()
//!         .with_feed(FeedConfig::new("tech", "local").with_source("https://example.com/rss"));
//!     let resolver = move |_: &FeedConfig| -> feedcast::ingest::Result<Arc<dyn StoreView>> {
//!         Ok(shared.clone())
//!     };
//!     let bridge = Bridge::start(&config, &resolver);
//!
//!     // Hand bridge.observer() to the poll adapters...
//!
//!     bridge.shutdown().await?;
//!     reader.terminate();
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `feedcast::core` - Entries, keys, codec, output document
//! - `feedcast::store` - Store view trait and backends
//! - `feedcast::ingest` - Entry cache, retention, coordinator
//! - `feedcast::regen` - Regeneration engine and sinks

pub mod bridge;
pub mod error;
pub mod manager;
pub mod reader;

pub use feedcast_core as core;
pub use feedcast_ingest as ingest;
pub use feedcast_regen as regen;
pub use feedcast_store as store;

pub use bridge::Bridge;
pub use error::{FeedcastError, Result};
pub use manager::FeedManager;
pub use reader::{FeedReader, ReaderConfig};

pub use feedcast_core::{ChannelId, Entry, EntryKey, OutputDocument};
pub use feedcast_ingest::{BridgeConfig, FeedConfig, PollObserver, RetentionConfig};
pub use feedcast_regen::{Freshness, ObserverId, RegenerationEngine};
pub use feedcast_store::StoreView;
