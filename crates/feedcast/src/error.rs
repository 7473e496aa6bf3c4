//! Error types for feedcast.

use feedcast_core::CoreError;
use feedcast_ingest::IngestError;
use feedcast_regen::RegenError;
use feedcast_store::StoreError;
use thiserror::Error;

/// Errors that can occur in feedcast operations.
#[derive(Debug, Error)]
pub enum FeedcastError {
    /// Entry codec error.
    #[error("codec error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Ingestion error.
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Regeneration error.
    #[error("regeneration error: {0}")]
    Regen(#[from] RegenError),

    /// Configuration rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No entry stored under the key.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Filesystem error outside document publication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A feed with this name is already configured.
    #[error("feed already configured: {0}")]
    DuplicateFeed(String),

    /// Background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for feedcast operations.
pub type Result<T> = std::result::Result<T, FeedcastError>;
