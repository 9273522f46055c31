//! Cache backends
//!
//! A backend is a plain byte store addressed by fingerprint. Eviction is
//! the backend's business; the method cache only decides hit or miss.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::errors::{CacheError, CacheResult};

/// Generic get/set store.
pub trait CacheBackend {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    fn delete(&self, key: &str) -> CacheResult<()>;
}

impl<C: CacheBackend + ?Sized> CacheBackend for Arc<C> {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        (**self).delete(key)
    }
}

/// Rejects keys outside `[A-Za-z0-9_.-]`.
pub fn validate_key(key: &str) -> CacheResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidArgument(key.to_string()))
    }
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::Unavailable("Lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        validate_key(key)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("Lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        validate_key(key)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("Lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

const CACHE_EXTENSION: &str = "cache";

/// One file per key under a directory.
///
/// Writes go through a uniquely named temp file and a rename, so
/// concurrent writers of the same key leave one complete entry.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> CacheResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, CACHE_EXTENSION)))
    }
}

fn unavailable(path: &Path, e: io::Error) -> CacheError {
    CacheError::Unavailable(format!("{}: {}", path.display(), e))
}

impl CacheBackend for FileCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let path = self.entry_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        let path = self.entry_path(key)?;
        fs::create_dir_all(&self.root).map_err(|e| unavailable(&self.root, e))?;

        let temp_path = self.root.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| unavailable(&temp_path, e))?;

        if let Err(e) = file.write_all(value) {
            let _ = fs::remove_file(&temp_path);
            return Err(unavailable(&temp_path, e));
        }
        drop(file);

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            unavailable(&path, e)
        })
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}
