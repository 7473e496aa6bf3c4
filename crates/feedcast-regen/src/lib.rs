//! # Feedcast Regen
//!
//! Rebuilds a feed's output document whenever its store reports a mutation,
//! and tracks whether the published document is fresh.
//!
//! ## Key Types
//!
//! - [`RegenerationEngine`] - Full rebuild on every mutation, observer fan-out
//! - [`FreshnessTracker`] - Last update time and the refreshed flag
//! - [`DocumentSink`] - Where rebuilt documents go ([`FileSink`], [`MemorySink`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feedcast_core::ChannelMeta;
//! use feedcast_regen::{FileSink, RegenerationEngine};
//! use feedcast_store::MemoryStore;
//!
//! async fn example() -> feedcast_regen::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let sink = Arc::new(FileSink::new("/var/www/tech.rss")?);
//!     let engine = Arc::new(RegenerationEngine::new(
//!         store,
//!         ChannelMeta::new("tech", "technology news"),
//!         sink,
//!     ));
//!
//!     engine.add_observer(|last_update, engine| {
//!         println!("{:?} refreshed={}", last_update, engine.refreshed_since_update());
//!         Ok(())
//!     });
//!     let _listener = engine.spawn_listener();
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod freshness;
pub mod observers;
pub mod sink;

pub use engine::{RebuildReport, RegenerationEngine};
pub use error::{RegenError, Result};
pub use freshness::{Freshness, FreshnessTracker, UpdateTicket};
pub use observers::{Observer, ObserverId};
pub use sink::{DocumentSink, FileSink, MemorySink};
