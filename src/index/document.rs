//! Persisted index document
//!
//! Shape on disk:
//!
//! ```json
//! {
//!   "version": 1,
//!   "count": 2,
//!   "checksum": "crc32:1a2b3c4d",
//!   "updated_at": "2026-01-01T00:00:00Z",
//!   "index": { "alice": { ... }, "bob": { ... } }
//! }
//! ```
//!
//! `checksum` is the CRC32 of the compact JSON encoding of `index`.

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::entry::EntryMap;

/// Current document format version
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Versioned index snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub version: u32,
    pub count: usize,
    pub checksum: String,
    pub updated_at: DateTime<Utc>,
    pub index: EntryMap,
}

impl IndexDocument {
    /// Wraps an index, computing count and checksum.
    pub fn new(index: EntryMap) -> Result<Self, serde_json::Error> {
        let checksum = checksum_of(&index)?;
        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            count: index.len(),
            checksum,
            updated_at: Utc::now(),
            index,
        })
    }

    /// Checks count and checksum against the contained index.
    pub fn verify(&self) -> Result<(), String> {
        if self.count != self.index.len() {
            return Err(format!(
                "count {} does not match {} entries",
                self.count,
                self.index.len()
            ));
        }

        let actual = checksum_of(&self.index).map_err(|e| e.to_string())?;
        if actual != self.checksum {
            return Err(format!(
                "checksum mismatch: stored {}, computed {}",
                self.checksum, actual
            ));
        }

        Ok(())
    }

    pub fn into_index(self) -> EntryMap {
        self.index
    }
}

/// Formats the CRC32 of the index encoding as `crc32:xxxxxxxx`.
pub fn checksum_of(index: &EntryMap) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(index)?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(format!("crc32:{:08x}", hasher.finalize()))
}
