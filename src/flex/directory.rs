//! Flex Directory: one object type and everything its views need
//!
//! The directory owns the entry store, the index file, the observer, the
//! optional cache backend and the operation registry. Views hold it behind
//! an `Arc` and reach every collaborator through it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::collection::FlexCollection;
use super::errors::FlexResult;
use super::object::FlexObject;
use super::view::FlexIndex;
use crate::cache::{CacheBackend, OperationRegistry};
use crate::entry::EntryMap;
use crate::index::{IndexFile, Reconciler, Reconciliation, RowLoadError};
use crate::observability::{Event, LogObserver, MetricsRegistry, Observer};
use crate::store::{EntryStore, RowRead};

pub struct FlexDirectory {
    directory_type: String,
    store: Box<dyn EntryStore>,
    index_file: IndexFile,
    observer: Arc<dyn Observer>,
    cache: Option<Box<dyn CacheBackend>>,
    registry: OperationRegistry,
    metrics: MetricsRegistry,
    indexed_fields: Vec<String>,
    key_field: Option<String>,
}

/// Builder for [`FlexDirectory`].
pub struct FlexDirectoryBuilder {
    directory: FlexDirectory,
}

impl FlexDirectoryBuilder {
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.directory.observer = observer;
        self
    }

    /// Enables the method cache
    pub fn cache(mut self, backend: impl CacheBackend + 'static) -> Self {
        self.directory.cache = Some(Box::new(backend));
        self
    }

    pub fn boxed_cache(mut self, backend: Option<Box<dyn CacheBackend>>) -> Self {
        self.directory.cache = backend;
        self
    }

    pub fn registry(mut self, registry: OperationRegistry) -> Self {
        self.directory.registry = registry;
        self
    }

    /// Row fields copied into index entries
    pub fn indexed_fields(mut self, fields: Vec<String>) -> Self {
        self.directory.indexed_fields = fields;
        self
    }

    /// Key field of views returned by [`FlexDirectory::index`]
    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.directory.key_field = Some(field.into());
        self
    }

    pub fn build(self) -> Arc<FlexDirectory> {
        Arc::new(self.directory)
    }
}

impl FlexDirectory {
    /// Starts a directory with a log observer, no cache and the built-in
    /// operations.
    pub fn builder(
        directory_type: impl Into<String>,
        store: impl EntryStore + 'static,
        index_file: IndexFile,
    ) -> FlexDirectoryBuilder {
        FlexDirectoryBuilder {
            directory: FlexDirectory {
                directory_type: directory_type.into(),
                store: Box::new(store),
                index_file,
                observer: Arc::new(LogObserver::default()),
                cache: None,
                registry: OperationRegistry::with_builtins(),
                metrics: MetricsRegistry::new(),
                indexed_fields: Vec::new(),
                key_field: None,
            },
        }
    }

    pub fn directory_type(&self) -> &str {
        &self.directory_type
    }

    pub fn index_file(&self) -> &IndexFile {
        &self.index_file
    }

    pub fn observer(&self) -> &dyn Observer {
        &*self.observer
    }

    pub fn cache(&self) -> Option<&dyn CacheBackend> {
        self.cache.as_deref()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn indexed_fields(&self) -> &[String] {
        &self.indexed_fields
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&*self.store, &self.index_file, &*self.observer)
            .with_indexed_fields(&self.indexed_fields)
            .with_metrics(&self.metrics)
    }

    /// Brings the persisted index up to date with the store.
    pub fn reconcile(&self) -> FlexResult<Reconciliation> {
        Ok(self.reconciler().refresh()?)
    }

    /// Reconciles and returns a view keyed by the configured key field.
    pub fn index(self: &Arc<Self>) -> FlexResult<FlexIndex> {
        let reconciliation = self.reconcile()?;
        let index = FlexIndex::new(self.clone(), reconciliation.index, None);
        Ok(match &self.key_field {
            Some(field) => index.with_key_field(Some(field.as_str())),
            None => index,
        })
    }

    /// Loads the rows behind `entries` in one batch.
    ///
    /// Objects keep the map keys of `entries` and their order. Rows that
    /// vanished are skipped; rows that fail to load are reported and
    /// skipped.
    pub fn load_objects(&self, entries: &EntryMap) -> FlexResult<Vec<FlexObject>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let storage_keys: Vec<String> = entries.values().map(|e| e.storage_key.clone()).collect();
        self.metrics.record_row_batch(storage_keys.len());
        let mut rows: HashMap<String, RowRead> = self.store.read_rows(&storage_keys)?.into_iter().collect();

        let mut objects = Vec::with_capacity(entries.len());
        for (key, entry) in entries.iter() {
            match rows.remove(&entry.storage_key) {
                Some(RowRead::Row(row)) => objects.push(FlexObject::new(key.clone(), entry.clone(), row)),
                Some(RowRead::Failed(reason)) => {
                    self.metrics.increment_row_failures();
                    self.observer.report(
                        Event::RowLoadFailed,
                        &RowLoadError {
                            key: entry.storage_key.clone(),
                            reason,
                        },
                    );
                }
                Some(RowRead::Missing) | None => {}
            }
        }
        Ok(objects)
    }

    pub fn load_collection(&self, entries: &EntryMap, key_field: &str) -> FlexResult<FlexCollection> {
        let objects = self.load_objects(entries)?;
        Ok(FlexCollection::new(self.directory_type.clone(), key_field, objects))
    }
}

impl fmt::Debug for FlexDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlexDirectory")
            .field("type", &self.directory_type)
            .field("index_file", &self.index_file.path())
            .field("cached", &self.cache.is_some())
            .field("indexed_fields", &self.indexed_fields)
            .finish()
    }
}
