//! Error types for the content transducers.

use thiserror::Error;

use folio_assets::{AssetError, ConfigError};
use folio_store::StoreError;

/// Errors that abort an ingestion run.
///
/// Per-block problems (unresolved images, untagged values) are logged and
/// skipped; only persistence failures stop the walk.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that abort publication.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors assembling the transducers from configuration.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("asset setup failed: {0}")]
    Asset(#[from] AssetError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
