//! Error types for the regeneration engine.

use feedcast_store::StoreError;
use thiserror::Error;

/// Errors that can occur while rebuilding or publishing a document.
#[derive(Debug, Error)]
pub enum RegenError {
    /// Key set could not be read.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Document could not be written out.
    #[error("publish failed: {0}")]
    Publish(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for regeneration operations.
pub type Result<T> = std::result::Result<T, RegenError>;
