//! # Feedcast Core
//!
//! Pure primitives for feedcast: syndication entries, their store keys,
//! the canonical entry codec, and the output document.
//!
//! This crate contains no I/O, no storage, no concurrency. It is pure
//! computation over feed data.
//!
//! ## Key Types
//!
//! - [`Entry`] - One syndication item (title, description, link, timestamp)
//! - [`EntryKey`] - Deterministic store key `<timestamp>/<title-hash>`
//! - [`ChannelId`] - Identifier for one feed source under a logical feed
//! - [`OutputDocument`] - The rebuilt, publishable feed
//!
//! ## Canonicalization
//!
//! Entries are stored as deterministic CBOR. See the [`canonical`] module.

pub mod canonical;
pub mod channel;
pub mod document;
pub mod entry;
pub mod error;

pub use canonical::{decode_entry, encode_entry, ENTRY_VERSION};
pub use channel::ChannelId;
pub use document::{ChannelMeta, DocumentItem, OutputDocument};
pub use entry::{format_key_timestamp, title_hash, Entry, EntryKey};
pub use error::CoreError;
