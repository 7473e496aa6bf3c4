//! # Feedcast Testkit
//!
//! Testing utilities for feedcast.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned keys and entry blobs; every peer must agree on them
//! - **Generators**: Proptest strategies for entries and timestamps
//! - **Fixtures**: Feeds with in-memory stores and timestamp series
//! - **Fault injection**: [`FailingStore`] fails selected puts
//!
//! ## Golden Vectors
//!
//! ```rust
//! use feedcast_testkit::vectors::verify_key_vectors;
//!
//! for (name, matches, key) in verify_key_vectors() {
//!     assert!(matches, "{}: {}", name, key);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use feedcast_testkit::generators::{entry_from_params, EntryParams};
//!
//! proptest! {
//!     #[test]
//!     fn key_is_deterministic(params: EntryParams) {
//!         let e = entry_from_params(&params);
//!         prop_assert_eq!(e.key().unwrap(), e.clone().key().unwrap());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use feedcast_testkit::fixtures::FeedFixture;
//!
//! let fixture = FeedFixture::new("tech");
//! let entries = fixture.series(7);
//! assert_eq!(entries.len(), 7);
//! ```

pub mod failing;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use failing::FailingStore;
pub use fixtures::{minutes, multi_feed_fixtures, put_entry, FeedFixture, BASE_TIMESTAMP};
pub use generators::{distinct_entries, entry_from_params, EntryParams};
pub use vectors::{key_vectors, verify_entry_blob, verify_key_vectors, KeyVector};
