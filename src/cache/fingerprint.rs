//! Cache fingerprints
//!
//! A fingerprint names one cached call: the directory type, the operation,
//! its arguments, the cache scope and the state of the index it ran on.
//! Any change to the index keys or timestamps produces a new fingerprint,
//! so stale entries are never hit and never need explicit eviction.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Cache key of one operation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes `{type_name}.{sha256(operation . scope_key arguments checksum)}`.
    ///
    /// `scope_key` is empty for globally shared results and the session id
    /// for session-scoped ones.
    pub fn compute(
        type_name: &str,
        operation: &str,
        scope_key: &str,
        arguments: &Value,
        index_checksum: &str,
    ) -> Self {
        let material = format!("{}.{}{}{}", operation, scope_key, arguments, index_checksum);
        Fingerprint(format!("{}.{}", type_name, sha256_hex(material.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
