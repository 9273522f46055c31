//! Index file: durable snapshot of an index
//!
//! Writers hold an exclusive advisory lock on a sidecar `<name>.lock` file
//! for the whole read-modify-write span. Readers never lock; they see
//! either the previous or the next complete document because writes go
//! through a temp file, fsync and rename.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use uuid::Uuid;

use super::document::{IndexDocument, INDEX_FORMAT_VERSION};
use super::errors::{IndexFileError, IndexFileResult};
use crate::entry::EntryMap;

/// Directory holding index files, relative to the storage root
pub const INDEX_DIR: &str = ".flex";

/// Default index file name
pub const INDEX_FILE_NAME: &str = "index.json";

/// Held exclusive lock on an index file; released on drop.
#[derive(Debug)]
pub struct IndexLock {
    file: File,
    path: PathBuf,
}

impl IndexLock {
    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Location of a persisted index.
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl IndexFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| INDEX_FILE_NAME.into());
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    /// Default index location for a storage root: `<root>/.flex/index.json`
    pub fn for_storage(root: &Path) -> Self {
        Self::new(root.join(INDEX_DIR).join(INDEX_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads and validates the document.
    ///
    /// Returns `Ok(None)` when no index has been written yet.
    pub fn load(&self) -> IndexFileResult<Option<IndexDocument>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexFileError::io(&self.path, e)),
        };

        let document: IndexDocument =
            serde_json::from_slice(&content).map_err(|e| IndexFileError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if document.version != INDEX_FORMAT_VERSION {
            return Err(IndexFileError::UnsupportedVersion {
                path: self.path.clone(),
                found: document.version,
            });
        }

        document.verify().map_err(|reason| IndexFileError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;

        Ok(Some(document))
    }

    fn open_lock_file(&self) -> IndexFileResult<File> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| IndexFileError::io(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| IndexFileError::Lock {
                path: self.lock_path.clone(),
                source: e,
            })
    }

    /// Blocks until the exclusive lock is held.
    pub fn lock(&self) -> IndexFileResult<IndexLock> {
        let file = self.open_lock_file()?;
        file.lock_exclusive().map_err(|e| IndexFileError::Lock {
            path: self.lock_path.clone(),
            source: e,
        })?;
        Ok(IndexLock {
            file,
            path: self.lock_path.clone(),
        })
    }

    /// Takes the lock if it is free; `Ok(None)` when another holder has it.
    pub fn try_lock(&self) -> IndexFileResult<Option<IndexLock>> {
        let file = self.open_lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(IndexLock {
                file,
                path: self.lock_path.clone(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(IndexFileError::Lock {
                path: self.lock_path.clone(),
                source: e,
            }),
        }
    }

    /// Writes the index atomically while `lock` is held.
    pub fn save(&self, lock: &IndexLock, index: &EntryMap) -> IndexFileResult<IndexDocument> {
        if lock.path() != self.lock_path.as_path() {
            return Err(IndexFileError::Lock {
                path: self.lock_path.clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("lock held on {}", lock.path().display()),
                ),
            });
        }

        let document = IndexDocument::new(index.clone())
            .map_err(|e| IndexFileError::Serialization(e.to_string()))?;
        let content = serde_json::to_vec_pretty(&document)
            .map_err(|e| IndexFileError::Serialization(e.to_string()))?;

        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent).map_err(|e| IndexFileError::io(&parent, e))?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(INDEX_FILE_NAME);
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| IndexFileError::io(&temp_path, e))?;

        let written = file.write_all(&content).and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(IndexFileError::io(&temp_path, e));
        }
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(IndexFileError::io(&self.path, e));
        }

        // fsync the directory so the rename itself is durable
        if let Ok(dir) = File::open(&parent) {
            let _ = dir.sync_all();
        }

        Ok(document)
    }
}
