//! Cache entry schema
//!
//! Entries are versioned JSON documents. Index-like results are stored as
//! index entries, never as hydrated objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CacheError, CacheResult};
use crate::entry::EntryMap;

/// Current cache entry format version
pub const CACHE_ENTRY_VERSION: u32 = 1;

/// Stored result of one operation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: u32,
    pub operation: String,
    pub payload: CachedPayload,
}

/// What a cached call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedPayload {
    /// Index view over `directory_type`, keyed by `key_field`
    Index {
        directory_type: String,
        key_field: String,
        entries: EntryMap,
    },
    /// Plain value
    Value { value: Value },
}

impl CacheEntry {
    pub fn new(operation: impl Into<String>, payload: CachedPayload) -> Self {
        Self {
            version: CACHE_ENTRY_VERSION,
            operation: operation.into(),
            payload,
        }
    }

    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decodes and checks the format version.
    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        let entry: CacheEntry =
            serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))?;
        if entry.version != CACHE_ENTRY_VERSION {
            return Err(CacheError::UnsupportedVersion(entry.version));
        }
        Ok(entry)
    }
}
