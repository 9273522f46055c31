//! # Entry Store Errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for entry store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Entry store errors
///
/// These cover the store as a whole. A single row that fails to load is
/// not an error at this level; it is reported as `RowRead::Failed`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Row serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Wraps an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "FLEX_STORE_IO_ERROR",
            StoreError::InvalidKey(_) => "FLEX_STORE_INVALID_KEY",
            StoreError::Serialization { .. } => "FLEX_STORE_SERIALIZATION",
            StoreError::Internal(_) => "FLEX_STORE_INTERNAL",
        }
    }
}
