//! # Feedcast Store
//!
//! The narrow view feedcast has of the replicated key/value store.
//!
//! ## Overview
//!
//! Replication itself lives outside feedcast. This crate abstracts the key
//! space behind the [`StoreView`] trait: write a blob, read a blob, list all
//! keys, and subscribe to mutation notifications. Ingestion only writes,
//! regeneration only reads and listens.
//!
//! ## Key Types
//!
//! - [`StoreView`] - The async trait for all key-space operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage; also simulates peer writes
//! - [`PrefixedStore`] - Per-feed namespace over a shared store
//! - [`MutationSubscription`] - Stream of [`StoreMutation`] notifications
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use feedcast_store::{PrefixedStore, SqliteStore, StoreView};
//!
//! async fn example() -> feedcast_store::Result<()> {
//!     let shared = std::sync::Arc::new(SqliteStore::open("feeds.db")?);
//!     let tech = PrefixedStore::new(shared, "tech")?;
//!
//!     let mut changes = tech.subscribe();
//!     tech.put("2011-03-14_09-26-53/0123456789abcdef", Bytes::from_static(b"..")).await?;
//!     let mutation = changes.recv().await;
//!     # let _ = mutation;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod prefixed;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use prefixed::PrefixedStore;
pub use sqlite::SqliteStore;
pub use traits::{
    MutationNotifier, MutationOrigin, MutationSubscription, PutResult, StoreMutation, StoreView,
};
