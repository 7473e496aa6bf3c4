//! Error types for feedcast core.

use thiserror::Error;

/// Core errors that can occur while deriving keys or (de)serializing entries.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported entry version: {0}")]
    UnsupportedVersion(u8),

    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
