//! Entry Store: the key -> row storage an index summarizes
//!
//! The store is an external collaborator. The index only needs two things
//! from it: a listing of existing keys with their timestamps, and a batched
//! read of full rows.
//!
//! # Implementations
//!
//! - `FolderStore`: one JSON file per object in a directory
//! - `MemoryStore`: in-process rows, with read accounting

mod errors;
mod folder;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use folder::FolderStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A full stored object.
pub type Row = Map<String, Value>;

/// Outcome of reading one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowRead {
    /// Row loaded
    Row(Row),
    /// No row under this key
    Missing,
    /// Row exists but could not be loaded
    Failed(String),
}

/// Key-value object store with per-row timestamps.
pub trait EntryStore {
    /// Lists every existing storage key with its timestamp.
    fn existing_keys(&self) -> StoreResult<BTreeMap<String, i64>>;

    /// Reads a batch of rows.
    ///
    /// Returns one result per requested key, in request order.
    fn read_rows(&self, keys: &[String]) -> StoreResult<Vec<(String, RowRead)>>;
}

impl<S: EntryStore + ?Sized> EntryStore for Box<S> {
    fn existing_keys(&self) -> StoreResult<BTreeMap<String, i64>> {
        (**self).existing_keys()
    }

    fn read_rows(&self, keys: &[String]) -> StoreResult<Vec<(String, RowRead)>> {
        (**self).read_rows(keys)
    }
}

impl<S: EntryStore + ?Sized> EntryStore for std::sync::Arc<S> {
    fn existing_keys(&self) -> StoreResult<BTreeMap<String, i64>> {
        (**self).existing_keys()
    }

    fn read_rows(&self, keys: &[String]) -> StoreResult<Vec<(String, RowRead)>> {
        (**self).read_rows(keys)
    }
}
