//! Golden test vectors for key derivation and entry encoding.
//!
//! Any peer that derives a different key for the same (timestamp, title)
//! would upload duplicates instead of overwriting, so these are pinned.

use feedcast_core::{encode_entry, Entry, EntryKey};

/// A golden key vector.
#[derive(Debug, Clone)]
pub struct KeyVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Unix milliseconds, UTC.
    pub published_at: i64,
    pub title: &'static str,
    pub expected_key: &'static str,
}

/// Get all golden key vectors.
pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "plain title with sub-second timestamp",
            published_at: 1_300_094_813_589, // 2011-03-14T09:26:53.589Z
            title: "Hello",
            expected_key: "2011-03-14_09-26-53/28fa47b55e9de633",
        },
        KeyVector {
            name: "epoch",
            published_at: 0,
            title: "epoch",
            expected_key: "1970-01-01_00-00-00/84d2e0d257d27ae0",
        },
        KeyVector {
            name: "title with spaces and digits",
            published_at: 1_431_648_000_000,
            title: "Rust 1.0 released",
            expected_key: "2015-05-15_00-00-00/f6a83d33c69c7de6",
        },
        KeyVector {
            name: "non-ascii title",
            published_at: 1_736_870_400_000,
            title: "Ünïcödé title",
            expected_key: "2025-01-14_16-00-00/2a016c6ebf16e621",
        },
        KeyVector {
            name: "before epoch",
            published_at: -86_400_000,
            title: "before epoch",
            expected_key: "1969-12-31_00-00-00/256163494568226b",
        },
    ]
}

/// Canonical blob of `Entry { title: "Hello", description: "", link: "", published_at: 0 }`.
pub const HELLO_ENTRY_BLOB_HEX: &str = "a50000016548656c6c6f026003600400";

/// The entry [`HELLO_ENTRY_BLOB_HEX`] encodes.
pub fn hello_entry() -> Entry {
    Entry::new("Hello", "", "", 0)
}

/// Decode [`HELLO_ENTRY_BLOB_HEX`] into bytes.
pub fn hello_entry_blob() -> Vec<u8> {
    hex::decode(HELLO_ENTRY_BLOB_HEX).unwrap_or_default()
}

/// Check every key vector; returns (name, matches, derived key).
pub fn verify_key_vectors() -> Vec<(String, bool, String)> {
    key_vectors()
        .iter()
        .map(|v| {
            let derived = EntryKey::derive(v.published_at, v.title)
                .map(EntryKey::into_string)
                .unwrap_or_default();
            (v.name.to_string(), derived == v.expected_key, derived)
        })
        .collect()
}

/// Whether the Hello entry still encodes to the pinned blob.
pub fn verify_entry_blob() -> bool {
    encode_entry(&hello_entry())
        .map(|bytes| bytes == hello_entry_blob())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcast_core::decode_entry;

    #[test]
    fn test_key_vectors_match() {
        for (name, matches, derived) in verify_key_vectors() {
            assert!(matches, "vector '{}' derived {}", name, derived);
        }
    }

    #[test]
    fn test_entry_blob_matches() {
        assert!(verify_entry_blob());
        assert_eq!(decode_entry(&hello_entry_blob()).unwrap(), hello_entry());
    }
}
