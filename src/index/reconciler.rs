//! Index Reconciler
//!
//! Brings a persisted index up to date with the store's current key set.
//!
//! # Behavior
//!
//! - Keys gone from the store are dropped without reading anything
//! - Entries whose timestamp still matches are kept as-is
//! - Nothing changed: the input index is returned, no lock, no reads
//! - Otherwise the index file is locked, every changed or new row is read
//!   in one batch, the index is sorted naturally by key and written back
//!   before the lock is released
//!
//! A row that fails to load stays indexed with its error flag set and is
//! reported; it never aborts the pass.

use std::collections::BTreeMap;

use super::errors::{IndexLoadError, IndexResult, RowLoadError};
use super::file::IndexFile;
use crate::entry::{EntryMap, IndexEntry, STORAGE_KEY, STORAGE_TIMESTAMP};
use crate::observability::{ChangeSummary, Event, MetricsRegistry, Observer};
use crate::store::{EntryStore, Row, RowRead};

/// Work left after diffing a persisted index against the store listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    /// Persisted index with removed keys already dropped
    pub index: EntryMap,
    /// Keys no longer listed by the store
    pub removed: Vec<String>,
    /// Keys to (re)read, with their current timestamps
    pub pending: BTreeMap<String, i64>,
}

impl ReconcilePlan {
    /// Diffs `persisted` against the `current` listing.
    pub fn new(mut persisted: EntryMap, current: &BTreeMap<String, i64>) -> Self {
        let mut removed = Vec::new();
        persisted.retain(|key, _| {
            let keep = current.contains_key(key);
            if !keep {
                removed.push(key.to_string());
            }
            keep
        });

        let mut pending = current.clone();
        for entry in persisted.values() {
            if current.get(&entry.storage_key) == Some(&entry.storage_timestamp) {
                pending.remove(&entry.storage_key);
            }
        }

        Self {
            index: persisted,
            removed,
            pending,
        }
    }

    /// True when nothing was added, changed or removed
    pub fn is_noop(&self) -> bool {
        self.pending.is_empty() && self.removed.is_empty()
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub index: EntryMap,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Rows requested from the store (0 on the fast path)
    pub rows_read: usize,
    /// Whether the index file was rewritten
    pub written: bool,
}

impl Reconciliation {
    fn unchanged(index: EntryMap) -> Self {
        Self {
            index,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            rows_read: 0,
            written: false,
        }
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            total: self.index.len(),
            added: self.added.len(),
            updated: self.updated.len(),
            removed: self.removed.len(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        !self.written
    }
}

/// Reconciles one directory's index against its entry store.
pub struct Reconciler<'a> {
    store: &'a dyn EntryStore,
    index_file: &'a IndexFile,
    observer: &'a dyn Observer,
    metrics: Option<&'a MetricsRegistry>,
    indexed_fields: &'a [String],
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn EntryStore,
        index_file: &'a IndexFile,
        observer: &'a dyn Observer,
    ) -> Self {
        Self {
            store,
            index_file,
            observer,
            metrics: None,
            indexed_fields: &[],
        }
    }

    /// Row fields copied into each index entry
    pub fn with_indexed_fields(mut self, fields: &'a [String]) -> Self {
        self.indexed_fields = fields;
        self
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reads the persisted index, falling back to empty.
    ///
    /// A missing file is a normal cold start. An unreadable one is
    /// reported as an index load failure.
    pub fn load_persisted(&self) -> EntryMap {
        match self.index_file.load() {
            Ok(Some(document)) => {
                self.observer.debug(
                    Event::IndexLoaded,
                    &format!("{} entries from {}", document.count, self.index_file.path().display()),
                );
                document.into_index()
            }
            Ok(None) => EntryMap::new(),
            Err(e) => {
                self.observer
                    .report(Event::IndexLoadFailed, &IndexLoadError::from(e));
                EntryMap::new()
            }
        }
    }

    /// Loads the persisted index and reconciles it with a fresh listing.
    pub fn refresh(&self) -> IndexResult<Reconciliation> {
        let persisted = self.load_persisted();
        let current = self.store.existing_keys()?;
        self.reconcile(persisted, &current)
    }

    /// Reconciles `persisted` with the `current` storage_key -> timestamp listing.
    pub fn reconcile(
        &self,
        persisted: EntryMap,
        current: &BTreeMap<String, i64>,
    ) -> IndexResult<Reconciliation> {
        let plan = ReconcilePlan::new(persisted, current);

        if plan.is_noop() {
            if let Some(metrics) = self.metrics {
                metrics.increment_index_up_to_date();
            }
            self.observer.debug(
                Event::IndexUpToDate,
                &format!("{} objects, nothing to refresh", plan.index.len()),
            );
            return Ok(Reconciliation::unchanged(plan.index));
        }

        let lock = self.index_file.lock()?;

        let ReconcilePlan {
            mut index,
            mut removed,
            pending,
        } = plan;

        let keys: Vec<String> = pending.keys().cloned().collect();
        let rows = if keys.is_empty() {
            Vec::new()
        } else {
            if let Some(metrics) = self.metrics {
                metrics.record_row_batch(keys.len());
            }
            self.store.read_rows(&keys)?
        };

        let mut added = Vec::new();
        let mut updated = Vec::new();

        for (key, read) in rows {
            let Some(&timestamp) = pending.get(&key) else {
                continue;
            };

            let mut entry = IndexEntry::new(key.clone(), timestamp);
            match read {
                RowRead::Row(row) => self.copy_indexed_fields(&mut entry, &row),
                RowRead::Failed(reason) => {
                    entry.load_error = true;
                    if let Some(metrics) = self.metrics {
                        metrics.increment_row_failures();
                    }
                    self.observer.report(
                        Event::RowLoadFailed,
                        &RowLoadError {
                            key: key.clone(),
                            reason,
                        },
                    );
                }
                RowRead::Missing => {
                    if index.remove(&key).is_some() {
                        removed.push(key);
                    }
                    continue;
                }
            }

            if index.contains_key(&key) {
                updated.push(key.clone());
            } else {
                added.push(key.clone());
            }
            index.insert(key, entry);
        }

        index.sort_keys();

        let reconciliation = Reconciliation {
            index,
            added,
            updated,
            removed,
            rows_read: keys.len(),
            written: true,
        };

        self.observer.index_updated(&reconciliation.summary());
        self.index_file.save(&lock, &reconciliation.index)?;
        drop(lock);

        if let Some(metrics) = self.metrics {
            metrics.increment_index_updates();
        }

        Ok(reconciliation)
    }

    fn copy_indexed_fields(&self, entry: &mut IndexEntry, row: &Row) {
        for field in self.indexed_fields {
            // Identity fields always come from the store listing
            if field == STORAGE_KEY || field == STORAGE_TIMESTAMP {
                continue;
            }
            if let Some(value) = row.get(field).filter(|v| !v.is_null()) {
                entry.set_field(field.clone(), value.clone());
            }
        }
    }
}
