//! Error types for the ingestion bridge.

use feedcast_core::CoreError;
use feedcast_store::StoreError;
use thiserror::Error;

/// Errors that can occur while ingesting entries.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Entry could not be keyed or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// Store write failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Channel setup rejected.
    #[error("invalid channel for feed {feed:?}: {reason}")]
    InvalidChannel { feed: String, reason: String },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_has_a_source_or_context() {
        let errors = [
            IngestError::from(CoreError::TimestampOutOfRange(i64::MAX)),
            IngestError::from(StoreError::InvalidKey(String::new())),
            IngestError::InvalidChannel {
                feed: "tech".into(),
                reason: "empty target".into(),
            },
        ];
        for error in &errors {
            match error {
                IngestError::Codec(_) | IngestError::Store(_) => {
                    assert!(std::error::Error::source(error).is_some())
                }
                IngestError::InvalidChannel { feed, .. } => {
                    assert!(error.to_string().contains(feed.as_str()))
                }
            }
        }
    }
}
