//! Asset error types.

use std::io;
use thiserror::Error;

/// Errors raised by asset stores, object indexes and the resolver setup.
///
/// Resolution itself never surfaces these to callers; they are logged and
/// the asset is reported as unresolved.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Asset or object not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path escapes the store root or is otherwise unusable.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configured pattern did not compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl AssetError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Why a remote fetch produced no bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    /// Any response other than 200.
    #[error("unexpected status {0}")]
    HttpStatus(u16),

    /// Request could not be built or the body could not be read.
    #[error("client error: {0}")]
    Client(String),
}

/// Asset result type.
pub type AssetResult<T> = Result<T, AssetError>;
