//! # Cache Errors
//!
//! Every cache error is soft: the call it belongs to still runs and
//! returns its result, only the cache read or write is skipped.

use thiserror::Error;

/// Result type for cache backend operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache backend errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Key rejected by the backend
    #[error("Invalid cache key: {0}")]
    InvalidArgument(String),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Entry could not be encoded or decoded
    #[error("Cache entry serialization failed: {0}")]
    Serialization(String),

    #[error("Unsupported cache entry version {0}")]
    UnsupportedVersion(u32),
}

impl CacheError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::InvalidArgument(_) => "FLEX_CACHE_INVALID_ARGUMENT",
            CacheError::Unavailable(_) => "FLEX_CACHE_UNAVAILABLE",
            CacheError::Serialization(_) => "FLEX_CACHE_SERIALIZATION",
            CacheError::UnsupportedVersion(_) => "FLEX_CACHE_UNSUPPORTED_VERSION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            CacheError::InvalidArgument("a/b".into()).code(),
            "FLEX_CACHE_INVALID_ARGUMENT"
        );
        assert_eq!(CacheError::UnsupportedVersion(7).to_string(), "Unsupported cache entry version 7");
    }
}
