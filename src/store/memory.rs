//! In-process entry store
//!
//! Keeps rows in a map and counts every batch read, which makes it the
//! store of choice for embedding and for asserting read behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use super::errors::{StoreError, StoreResult};
use super::{EntryStore, Row, RowRead};

#[derive(Debug, Clone)]
enum StoredRow {
    Row { timestamp: i64, row: Row },
    Broken { timestamp: i64, reason: String },
}

impl StoredRow {
    fn timestamp(&self) -> i64 {
        match self {
            StoredRow::Row { timestamp, .. } | StoredRow::Broken { timestamp, .. } => *timestamp,
        }
    }
}

/// Map-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, StoredRow>>,
    batches_read: AtomicU64,
    rows_read: AtomicU64,
    last_batch: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a row.
    pub fn insert(&self, key: impl Into<String>, timestamp: i64, row: Row) -> StoreResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        rows.insert(key.into(), StoredRow::Row { timestamp, row });
        Ok(())
    }

    /// Inserts a row that is listed but fails to load.
    pub fn insert_broken(
        &self,
        key: impl Into<String>,
        timestamp: i64,
        reason: impl Into<String>,
    ) -> StoreResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        rows.insert(
            key.into(),
            StoredRow::Broken {
                timestamp,
                reason: reason.into(),
            },
        );
        Ok(())
    }

    /// Removes a row, returning whether it existed.
    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        Ok(rows.remove(key).is_some())
    }

    /// Number of `read_rows` calls so far
    pub fn batches_read(&self) -> u64 {
        self.batches_read.load(Ordering::Relaxed)
    }

    /// Number of individual rows requested so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read.load(Ordering::Relaxed)
    }

    /// Keys requested by the most recent batch read
    pub fn last_batch(&self) -> Vec<String> {
        self.last_batch
            .lock()
            .map(|batch| batch.clone())
            .unwrap_or_default()
    }
}

impl EntryStore for MemoryStore {
    fn existing_keys(&self) -> StoreResult<BTreeMap<String, i64>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        Ok(rows
            .iter()
            .map(|(key, stored)| (key.clone(), stored.timestamp()))
            .collect())
    }

    fn read_rows(&self, keys: &[String]) -> StoreResult<Vec<(String, RowRead)>> {
        self.batches_read.fetch_add(1, Ordering::Relaxed);
        self.rows_read.fetch_add(keys.len() as u64, Ordering::Relaxed);
        if let Ok(mut last) = self.last_batch.lock() {
            *last = keys.to_vec();
        }

        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        Ok(keys
            .iter()
            .map(|key| {
                let read = match rows.get(key) {
                    Some(StoredRow::Row { row, .. }) => RowRead::Row(row.clone()),
                    Some(StoredRow::Broken { reason, .. }) => RowRead::Failed(reason.clone()),
                    None => RowRead::Missing,
                };
                (key.clone(), read)
            })
            .collect())
    }
}
