//! Entry: one syndication item, and the key it is stored under.
//!
//! The key is `<timestamp>/<title-hash>` where the timestamp is formatted as
//! UTC `%Y-%m-%d_%H-%M-%S`. Lexicographic key order is chronological order.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Format used for the timestamp half of an [`EntryKey`].
const KEY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Domain separator for title hashing.
const TITLE_HASH_DOMAIN: &[u8] = b"feedcast-title-v0:";

/// Number of hash bytes kept in a key (16 hex characters).
const TITLE_HASH_LEN: usize = 8;

/// One syndication item.
///
/// Immutable once built. `published_at` is Unix milliseconds, UTC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published_at: i64,
}

impl Entry {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
        published_at: i64,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            link: link.into(),
            published_at,
        }
    }

    /// Derive the store key for this entry.
    pub fn key(&self) -> Result<EntryKey, CoreError> {
        EntryKey::derive(self.published_at, &self.title)
    }

    /// Publication time as a UTC datetime, if representable.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.published_at).single()
    }

    /// Entries without a title cannot be keyed meaningfully and are skipped
    /// by the uploader.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Deterministic store key of an entry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey(String);

impl EntryKey {
    /// Derive a key from a publication timestamp and a title.
    ///
    /// Pure: identical inputs always produce the identical key.
    pub fn derive(published_at: i64, title: &str) -> Result<Self, CoreError> {
        let stamp = format_key_timestamp(published_at)?;
        Ok(Self(format!("{}/{}", stamp, title_hash(title))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryKey({})", self.0)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Format a Unix-millisecond timestamp the way keys carry it.
pub fn format_key_timestamp(published_at: i64) -> Result<String, CoreError> {
    let at = Utc
        .timestamp_millis_opt(published_at)
        .single()
        .ok_or(CoreError::TimestampOutOfRange(published_at))?;
    Ok(at.format(KEY_TIMESTAMP_FORMAT).to_string())
}

/// Short, stable hash of an entry title.
pub fn title_hash(title: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(TITLE_HASH_DOMAIN);
    hasher.update(title.as_bytes());
    hex::encode(&hasher.finalize().as_bytes()[..TITLE_HASH_LEN])
}
