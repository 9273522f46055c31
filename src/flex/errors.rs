//! # Flex Errors
//!
//! Errors returned by index views, collections and operation calls.
//! Cache and per-row failures are reported to the observer instead and
//! never show up here unless the caller asked for them directly.

use thiserror::Error;

use crate::cache::CacheError;
use crate::index::IndexError;
use crate::store::StoreError;

/// Result type for flex operations
pub type FlexResult<T> = Result<T, FlexError>;

/// Flex errors
#[derive(Debug, Error)]
pub enum FlexError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Invalid arguments for '{operation}': {reason}")]
    InvalidArguments { operation: String, reason: String },

    /// An operation result could not be mapped back onto its index
    #[error("Flex: Internal error: {0}")]
    Internal(String),
}

impl FlexError {
    pub fn invalid_arguments(operation: &str, reason: impl Into<String>) -> Self {
        FlexError::InvalidArguments {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FlexError::Index(e) => e.code(),
            FlexError::Store(e) => e.code(),
            FlexError::Cache(e) => e.code(),
            FlexError::UnknownOperation(_) => "FLEX_UNKNOWN_OPERATION",
            FlexError::InvalidArguments { .. } => "FLEX_INVALID_ARGUMENTS",
            FlexError::Internal(_) => "FLEX_INTERNAL",
        }
    }

    /// Internal invariant violations are bugs, not bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, FlexError::Internal(_))
    }
}
