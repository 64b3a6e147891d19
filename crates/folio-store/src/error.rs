//! Error types for block persistence.

use thiserror::Error;

use folio_types::BlockId;

/// Errors that can occur while saving or loading blocks.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Re-save of a block that was never created.
    #[error("block not found: {0:?}")]
    NotFound(BlockId),

    /// SQLite backend failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data that cannot be interpreted.
    #[error("internal store error: {0}")]
    Internal(String),
}
