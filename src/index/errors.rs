//! Index error types
//!
//! Error codes:
//! - FLEX_INDEX_IO_ERROR (fatal to the current reconciliation)
//! - FLEX_INDEX_LOCK_FAILED (fatal to the current reconciliation)
//! - FLEX_INDEX_CORRUPT (soft: the index restarts empty)
//! - FLEX_INDEX_UNSUPPORTED_VERSION (soft: the index restarts empty)
//! - FLEX_INDEX_SERIALIZATION (fatal to the current reconciliation)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Result type for index file operations
pub type IndexFileResult<T> = Result<T, IndexFileError>;

/// Result type for reconciliation
pub type IndexResult<T> = Result<T, IndexError>;

/// Failures reading or writing the persisted index document
#[derive(Debug, Error)]
pub enum IndexFileError {
    #[error("I/O error on index file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to lock index file {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Index file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Index file {} has unsupported version {found}", path.display())]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("Index serialization failed: {0}")]
    Serialization(String),
}

impl IndexFileError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IndexFileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexFileError::Io { .. } => "FLEX_INDEX_IO_ERROR",
            IndexFileError::Lock { .. } => "FLEX_INDEX_LOCK_FAILED",
            IndexFileError::Corrupt { .. } => "FLEX_INDEX_CORRUPT",
            IndexFileError::UnsupportedVersion { .. } => "FLEX_INDEX_UNSUPPORTED_VERSION",
            IndexFileError::Serialization(_) => "FLEX_INDEX_SERIALIZATION",
        }
    }

    /// Whether the failure must abort the surrounding operation
    ///
    /// Unreadable content only costs a cold start; failing to lock or
    /// write does not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            IndexFileError::Corrupt { .. } | IndexFileError::UnsupportedVersion { .. }
        )
    }
}

/// Reconciliation failures
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    File(#[from] IndexFileError),
}

impl IndexError {
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Store(e) => e.code(),
            IndexError::File(e) => e.code(),
        }
    }
}

/// A single row that failed to load; reported, never returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Object failed to load: {key} ({reason})")]
pub struct RowLoadError {
    pub key: String,
    pub reason: String,
}

/// The persisted index could not be used; reported, never returned
#[derive(Debug, Error)]
#[error("Index failed to load: {source}")]
pub struct IndexLoadError {
    #[from]
    source: IndexFileError,
}

impl IndexLoadError {
    pub fn cause(&self) -> &IndexFileError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let corrupt = IndexFileError::Corrupt {
            path: "index.json".into(),
            reason: "bad".into(),
        };
        assert_eq!(corrupt.code(), "FLEX_INDEX_CORRUPT");
        assert!(!corrupt.is_fatal());

        let io = IndexFileError::io("index.json", io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(io.code(), "FLEX_INDEX_IO_ERROR");
        assert!(io.is_fatal());
    }

    #[test]
    fn test_row_load_error_message() {
        let err = RowLoadError {
            key: "alice".into(),
            reason: "invalid json".into(),
        };
        assert_eq!(err.to_string(), "Object failed to load: alice (invalid json)");
    }

    #[test]
    fn test_index_load_error_wraps_cause() {
        let err = IndexLoadError::from(IndexFileError::UnsupportedVersion {
            path: "index.json".into(),
            found: 9,
        });
        assert!(err.to_string().starts_with("Index failed to load:"));
        assert_eq!(err.cause().code(), "FLEX_INDEX_UNSUPPORTED_VERSION");
    }
}
