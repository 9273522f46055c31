//! Folder-backed entry store
//!
//! Layout: `<root>/<storage_key>.json`, one JSON object per file. The row
//! timestamp is the file modification time in whole seconds, so a second
//! write to the same row within one second keeps its timestamp and is not
//! picked up by reconciliation until the file is touched again. Hidden files
//! and subdirectories are not part of the store, which leaves room for the
//! index file under `<root>/.flex/`.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde_json::Value;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::{EntryStore, Row, RowRead};

const ROW_EXTENSION: &str = "json";

/// Directory of JSON rows.
#[derive(Debug, Clone)]
pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    /// Creates a store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn row_path(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(&['/', '\\', '\0'][..])
            && key != "..";
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", key, ROW_EXTENSION)))
    }

    /// Writes a row atomically (temp file, fsync, rename).
    pub fn write_row(&self, key: &str, row: &Row) -> StoreResult<()> {
        let path = self.row_path(key)?;
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let content = serde_json::to_vec_pretty(row).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let temp_path = self.root.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(&content)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::io(&temp_path, e))?;

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::io(&path, e)
        })
    }

    /// Deletes a row. Deleting a missing row is not an error.
    pub fn delete_row(&self, key: &str) -> StoreResult<()> {
        let path = self.row_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn read_row(&self, key: &str) -> RowRead {
        let path = match self.row_path(key) {
            Ok(path) => path,
            Err(e) => return RowRead::Failed(e.to_string()),
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return RowRead::Missing,
            Err(e) => return RowRead::Failed(e.to_string()),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(row)) => RowRead::Row(row),
            Ok(_) => RowRead::Failed("row is not a JSON object".to_string()),
            Err(e) => RowRead::Failed(e.to_string()),
        }
    }
}

fn modified_secs(file: &Path) -> io::Result<i64> {
    let modified = File::open(file)?.metadata()?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0))
}

impl EntryStore for FolderStore {
    fn existing_keys(&self) -> StoreResult<BTreeMap<String, i64>> {
        let mut keys = BTreeMap::new();

        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        for item in dir {
            let item = item.map_err(|e| StoreError::io(&self.root, e))?;
            let path = item.path();

            let file_type = item.file_type().map_err(|e| StoreError::io(&path, e))?;
            if !file_type.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(ROW_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }

            // Rows deleted between listing and stat simply drop out
            match modified_secs(&path) {
                Ok(timestamp) => {
                    keys.insert(stem.to_string(), timestamp);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }

        Ok(keys)
    }

    fn read_rows(&self, keys: &[String]) -> StoreResult<Vec<(String, RowRead)>> {
        Ok(keys
            .iter()
            .map(|key| (key.clone(), self.read_row(key)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path().join("nope"));
        assert!(store.existing_keys().unwrap().is_empty());
    }

    #[test]
    fn test_write_then_list_and_read() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path());

        store.write_row("alice", &row(json!({"name": "Alice"}))).unwrap();
        store.write_row("bob", &row(json!({"name": "Bob"}))).unwrap();

        let keys = store.existing_keys().unwrap();
        assert_eq!(keys.keys().collect::<Vec<_>>(), vec!["alice", "bob"]);
        assert!(keys.values().all(|ts| *ts > 0));

        let rows = store
            .read_rows(&["bob".to_string(), "carol".to_string()])
            .unwrap();
        assert_eq!(rows[0].0, "bob");
        assert_eq!(rows[0].1, RowRead::Row(row(json!({"name": "Bob"}))));
        assert_eq!(rows[1].1, RowRead::Missing);
    }

    #[test]
    fn test_listing_skips_hidden_and_foreign_files() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path());

        store.write_row("alice", &row(json!({}))).unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        fs::write(temp.path().join(".hidden.json"), "{}").unwrap();
        fs::create_dir_all(temp.path().join(".flex")).unwrap();
        fs::write(temp.path().join(".flex").join("index.json"), "{}").unwrap();

        let keys = store.existing_keys().unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("alice"));
    }

    #[test]
    fn test_corrupt_row_reports_failure() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path());
        fs::write(temp.path().join("broken.json"), "{not json").unwrap();
        fs::write(temp.path().join("list.json"), "[1, 2]").unwrap();

        let rows = store
            .read_rows(&["broken".to_string(), "list".to_string()])
            .unwrap();
        assert!(matches!(rows[0].1, RowRead::Failed(_)));
        assert!(matches!(rows[1].1, RowRead::Failed(_)));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path());

        for key in ["", "..", "../etc", "a/b", ".hidden"] {
            assert!(matches!(
                store.write_row(key, &Row::new()),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_timestamp_is_whole_second_mtime() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path());
        store.write_row("alice", &row(json!({}))).unwrap();

        let modified = fs::metadata(temp.path().join("alice.json"))
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap();

        assert_eq!(store.existing_keys().unwrap()["alice"], modified.as_secs() as i64);
    }

    #[test]
    fn test_delete_row() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path());

        store.write_row("alice", &row(json!({}))).unwrap();
        store.delete_row("alice").unwrap();
        store.delete_row("alice").unwrap();

        assert!(store.existing_keys().unwrap().is_empty());
    }
}
