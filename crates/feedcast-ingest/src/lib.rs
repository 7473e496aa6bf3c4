//! # Feedcast Ingest
//!
//! The ingestion bridge: poll adapters report items, a shared cache buffers
//! them per channel, and a single coordinator applies retention and uploads
//! each entry to the channel's store.
//!
//! ## Key Types
//!
//! - [`EntryCache`] - Pending entries and admission thresholds, one lock
//! - [`PollObserver`] - Callbacks handed to poll adapters
//! - [`RetentionPolicy`] - Keeps the newest N items, moves the threshold
//! - [`Coordinator`] - Drain → retain → encode → put, one batch at a time
//! - [`ChannelRegistry`] - Channel → (feed, source, store, item list)
//!
//! ## Design Notes
//!
//! - **Single consumer**: only the coordinator drains; encoding and store
//!   I/O happen outside the cache lock.
//! - **Monotonic thresholds**: a channel's threshold only moves forward, so
//!   an item pruned once is never admitted again.
//! - **No retries**: a failed put is logged and counted, the batch goes on.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod items;
pub mod observer;
pub mod registry;
pub mod retention;

pub use cache::EntryCache;
pub use config::{BridgeConfig, FeedConfig, RetentionConfig, DEFAULT_RETAINED_COUNT};
pub use coordinator::{
    BatchReport, Coordinator, CoordinatorMonitor, CoordinatorPhase, CoordinatorStats,
};
pub use error::{IngestError, Result};
pub use items::{ItemList, MemoryItemList};
pub use observer::PollObserver;
pub use registry::{ChannelBinding, ChannelRegistry, StoreResolver};
pub use retention::{RetentionOutcome, RetentionPolicy};
