//! Flex Index: an immutable, keyed view over one directory's index
//!
//! A view owns its copy of the entries. Re-keying, sorting and cached
//! calls all return new views; nothing here mutates shared state.

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::collection::FlexCollection;
use super::directory::FlexDirectory;
use super::errors::{FlexError, FlexResult};
use super::object::FlexObject;
use super::ordering::{sort_by_orderings, Orderings};
use super::result::CallResult;
use crate::cache::{
    sha256_hex, CacheBackend, CacheEntry, CacheError, CachedPayload, CallContext, Fingerprint, ORDER_BY,
};
use crate::entry::{value_as_key, EntryMap, IndexEntry, DEFAULT_FIELDS, FLEX_KEY, KEY, STORAGE_KEY};
use crate::observability::Event;

#[derive(Clone)]
pub struct FlexIndex {
    directory: Arc<FlexDirectory>,
    entries: EntryMap,
    key_field: String,
    checksum: OnceCell<String>,
}

impl FlexIndex {
    /// View over `entries`, keyed by `key_field` (`storage_key` when `None`).
    ///
    /// The entries must already be keyed by that field.
    pub fn new(directory: Arc<FlexDirectory>, entries: EntryMap, key_field: Option<&str>) -> Self {
        Self {
            directory,
            entries,
            key_field: key_field.unwrap_or(STORAGE_KEY).to_string(),
            checksum: OnceCell::new(),
        }
    }

    fn derive(&self, entries: EntryMap, key_field: &str) -> Self {
        Self::new(self.directory.clone(), entries, Some(key_field))
    }

    pub fn directory(&self) -> &Arc<FlexDirectory> {
        &self.directory
    }

    pub fn directory_type(&self) -> &str {
        self.directory.directory_type()
    }

    /// `i.{type}` with `prefix`, the bare type otherwise
    pub fn type_name(&self, prefix: bool) -> String {
        if prefix {
            format!("i.{}", self.directory_type())
        } else {
            self.directory_type().to_string()
        }
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whole key -> entry map
    pub fn entries(&self) -> &EntryMap {
        &self.entries
    }

    pub fn into_entries(self) -> EntryMap {
        self.entries
    }

    /// key -> entry[field], `None` where an entry lacks the field.
    pub fn index_map(&self, field: &str) -> Vec<(String, Option<Value>)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), self.entry_value(key, entry, field)))
            .collect()
    }

    pub fn storage_keys(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.storage_key.clone()))
            .collect()
    }

    pub fn timestamps(&self) -> Vec<(String, i64)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.storage_timestamp))
            .collect()
    }

    pub fn flex_keys(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.flex_key_for(self.directory_type())))
            .collect()
    }

    pub fn meta_data(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Fields sorting can use without loading objects: those of the first
    /// entry plus the default fields.
    pub fn index_fields(&self) -> BTreeSet<String> {
        let mut fields: BTreeSet<String> = DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect();
        if let Some(first) = self.entries.values().next() {
            fields.extend(first.field_names());
        }
        fields
    }

    fn entry_value(&self, key: &str, entry: &IndexEntry, field: &str) -> Option<Value> {
        if field == self.key_field {
            return Some(Value::String(key.to_string()));
        }
        if field == FLEX_KEY {
            return Some(Value::String(entry.flex_key_for(self.directory_type())));
        }
        entry.field(field)
    }

    /// Same entries keyed by `field` (`key` when `None`).
    ///
    /// Entries without a usable value for `field` are left out, except for
    /// `flex_key` which is synthesized from the directory type.
    pub fn with_key_field(&self, field: Option<&str>) -> Self {
        let field = field.unwrap_or(KEY);
        if field == self.key_field {
            return self.clone();
        }

        let mut entries = EntryMap::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            let key = if field == FLEX_KEY {
                Some(entry.flex_key_for(self.directory_type()))
            } else {
                entry.field(field).as_ref().and_then(value_as_key)
            };
            if let Some(key) = key {
                entries.insert(key, entry.clone());
            }
        }
        self.derive(entries, field)
    }

    /// Sorts by `orderings`, on index metadata when every field is known to
    /// the index, through the cached `order_by` operation otherwise.
    pub fn order_by(&self, orderings: &Orderings, context: &CallContext) -> FlexResult<CallResult> {
        if orderings.is_empty() || self.is_empty() {
            return Ok(CallResult::Index(self.clone()));
        }

        let known = self.index_fields();
        if orderings.fields().all(|field| known.contains(field)) {
            return Ok(CallResult::Index(self.sorted_by_metadata(orderings)));
        }

        self.call(ORDER_BY, &[orderings.to_value()], context)
    }

    fn sorted_by_metadata(&self, orderings: &Orderings) -> Self {
        let mut keys = self.keys();
        sort_by_orderings(&mut keys, orderings, |key, field| {
            let entry = self.entries.get(key)?;
            self.entry_value(key, entry, field)
        });

        let mut entries = self.entries.clone();
        entries.reorder(keys);
        self.derive(entries, &self.key_field)
    }

    pub fn load_element(&self, key: &str) -> FlexResult<Option<FlexObject>> {
        Ok(self.load_elements(&[key.to_string()])?.into_iter().next())
    }

    /// Objects for `keys`, in the order given; unknown keys are skipped.
    pub fn load_elements(&self, keys: &[String]) -> FlexResult<Vec<FlexObject>> {
        let subset: EntryMap = keys
            .iter()
            .filter_map(|key| self.entries.get(key).map(|e| (key.clone(), e.clone())))
            .collect();
        self.directory.load_objects(&subset)
    }

    /// Every object of the view, keyed by the view's key field.
    pub fn load_collection(&self) -> FlexResult<FlexCollection> {
        self.directory.load_collection(&self.entries, &self.key_field)
    }

    /// `i.{type}.` + hash of the keys and key field
    pub fn cache_key(&self) -> String {
        let keys = Value::from(self.keys());
        let material = format!("{}{}", keys, self.key_field);
        format!("{}.{}", self.type_name(true), sha256_hex(material.as_bytes()))
    }

    /// Cache key plus a hash of every entry timestamp; computed once per view.
    pub fn cache_checksum(&self) -> &str {
        self.checksum.get_or_init(|| {
            let timestamps: Vec<Value> = self
                .entries
                .iter()
                .map(|(key, entry)| Value::from(vec![Value::from(key.clone()), Value::from(entry.storage_timestamp)]))
                .collect();
            let material = format!("{}{}", self.cache_key(), Value::Array(timestamps));
            sha256_hex(material.as_bytes())
        })
    }

    /// Runs a registered operation over the materialized collection,
    /// through the method cache when the operation's scope allows it.
    pub fn call(&self, operation: &str, arguments: &[Value], context: &CallContext) -> FlexResult<CallResult> {
        let directory = &self.directory;
        let op = directory
            .registry()
            .get(operation)
            .ok_or_else(|| FlexError::UnknownOperation(operation.to_string()))?;

        let cached = match (context.scope_key(op.scope()), directory.cache()) {
            (Some(scope_key), Some(cache)) => Some((scope_key, cache)),
            _ => None,
        };
        let Some((scope_key, cache)) = cached else {
            directory.metrics().increment_uncached_calls();
            directory
                .observer()
                .debug(Event::CallUncached, &format!("{} on {}", operation, self.type_name(true)));
            return op.invoke(&self.load_collection()?, arguments);
        };

        let fingerprint = Fingerprint::compute(
            &self.type_name(true),
            operation,
            &scope_key,
            &Value::from(arguments.to_vec()),
            self.cache_checksum(),
        );

        if let Some(result) = self.cached_result(cache, &fingerprint) {
            directory.metrics().increment_cache_hits();
            directory.observer().debug(Event::CacheHit, fingerprint.as_str());
            return Ok(result);
        }

        directory.metrics().increment_cache_misses();
        directory.observer().debug(Event::CacheMiss, fingerprint.as_str());

        let result = op.invoke(&self.load_collection()?, arguments)?;
        let entry = CacheEntry::new(operation, self.to_payload(&result)?);
        if let Err(e) = entry.encode().and_then(|bytes| cache.set(fingerprint.as_str(), &bytes)) {
            directory.metrics().increment_cache_failures();
            directory.observer().report(Event::CacheFailed, &e);
        }

        Ok(result)
    }

    fn cached_result(&self, cache: &dyn CacheBackend, fingerprint: &Fingerprint) -> Option<CallResult> {
        let directory = &self.directory;
        let report = |e: &CacheError| {
            directory.metrics().increment_cache_failures();
            directory.observer().report(Event::CacheFailed, e);
        };

        let bytes = match cache.get(fingerprint.as_str()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                report(&e);
                return None;
            }
        };

        // Undecodable entries are dropped so a failing recompute cannot leave them behind
        let entry = match CacheEntry::decode(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                report(&e);
                if let Err(e) = cache.delete(fingerprint.as_str()) {
                    report(&e);
                }
                return None;
            }
        };

        match entry.payload {
            CachedPayload::Index {
                directory_type,
                key_field,
                entries,
            } if directory_type == self.directory_type() => Some(CallResult::Index(
                self.derive(entries, &key_field)
                    .with_key_field(Some(self.key_field.as_str())),
            )),
            CachedPayload::Index { .. } => None,
            CachedPayload::Value { value } => Some(CallResult::Value(value)),
        }
    }

    /// Cacheable form of a live result. Index-like results are stored as
    /// entries of this view, so every object must map back onto one.
    fn to_payload(&self, result: &CallResult) -> FlexResult<CachedPayload> {
        match result {
            CallResult::Value(value) => Ok(CachedPayload::Value { value: value.clone() }),
            CallResult::Index(index) => Ok(CachedPayload::Index {
                directory_type: index.directory_type().to_string(),
                key_field: index.key_field().to_string(),
                entries: index.entries().clone(),
            }),
            CallResult::Collection(collection) => {
                if collection.directory_type() != self.directory_type() {
                    return Err(FlexError::Internal(format!(
                        "'{}' result cannot be indexed by '{}'",
                        collection.directory_type(),
                        self.directory_type()
                    )));
                }
                let mut entries = EntryMap::with_capacity(collection.len());
                for object in collection.iter() {
                    let entry = self.entries.get(object.key()).ok_or_else(|| {
                        FlexError::Internal(format!("object '{}' has no index entry", object.key()))
                    })?;
                    entries.insert(object.key(), entry.clone());
                }
                Ok(CachedPayload::Index {
                    directory_type: self.directory_type().to_string(),
                    key_field: self.key_field.clone(),
                    entries,
                })
            }
        }
    }
}

impl fmt::Debug for FlexIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlexIndex")
            .field("type", &self.directory_type())
            .field("key_field", &self.key_field)
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::flex::{Orderings, SortKey};
    use crate::index::IndexFile;
    use crate::observability::MemoryObserver;
    use crate::store::{MemoryStore, Row};
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    fn directory(temp: &TempDir, store: MemoryStore) -> Arc<FlexDirectory> {
        FlexDirectory::builder("accounts", store, IndexFile::for_storage(temp.path()))
            .indexed_fields(vec!["email".into(), "a".into(), "b".into()])
            .observer(Arc::new(MemoryObserver::new()))
            .cache(MemoryCache::new())
            .build()
    }

    fn sample_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("1", 10, row(json!({"a": 1, "b": 2, "email": "one@x.org", "score": 5}))).unwrap();
        store.insert("2", 20, row(json!({"a": 1, "b": 1, "email": "two@x.org", "score": 9}))).unwrap();
        store.insert("3", 30, row(json!({"a": 2, "b": 5, "score": 1}))).unwrap();
        store
    }

    #[test]
    fn test_projections() {
        let temp = TempDir::new().unwrap();
        let index = directory(&temp, sample_store()).index().unwrap();

        assert_eq!(index.keys(), vec!["1", "2", "3"]);
        assert_eq!(index.timestamps()[1], ("2".to_string(), 20));
        assert_eq!(index.flex_keys()[0].1, "accounts.obj:1");
        assert_eq!(
            index.index_map("email"),
            vec![
                ("1".to_string(), Some(json!("one@x.org"))),
                ("2".to_string(), Some(json!("two@x.org"))),
                ("3".to_string(), None),
            ]
        );
        assert_eq!(index.meta_data("3").map(|e| e.storage_timestamp), Some(30));
    }

    #[test]
    fn test_with_key_field_drops_entries_without_field() {
        let temp = TempDir::new().unwrap();
        let index = directory(&temp, sample_store()).index().unwrap();

        let by_email = index.with_key_field(Some("email"));
        assert_eq!(by_email.keys(), vec!["one@x.org", "two@x.org"]);
        assert_eq!(by_email.key_field(), "email");
        assert_eq!(index.len(), 3);

        let by_flex = index.with_key_field(Some("flex_key"));
        assert_eq!(by_flex.len(), 3);
        assert!(by_flex.meta_data("accounts.obj:3").is_some());
    }

    #[test]
    fn test_same_key_field_is_identity() {
        let temp = TempDir::new().unwrap();
        let index = directory(&temp, sample_store()).index().unwrap();
        let same = index.with_key_field(Some("storage_key"));
        assert_eq!(same.entries(), index.entries());
    }

    #[test]
    fn test_order_by_metadata_does_not_load() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(sample_store());
        let directory = FlexDirectory::builder("accounts", store.clone(), IndexFile::for_storage(temp.path()))
            .indexed_fields(vec!["a".into(), "b".into()])
            .build();
        let index = directory.index().unwrap();
        let batches = store.batches_read();

        let orderings = Orderings::new(vec![SortKey::asc("a"), SortKey::desc("b")]);
        let sorted = index
            .order_by(&orderings, &CallContext::anonymous())
            .unwrap()
            .into_index()
            .unwrap();

        assert_eq!(sorted.keys(), vec!["1", "2", "3"]);
        assert_eq!(store.batches_read(), batches);
    }

    #[test]
    fn test_order_by_unknown_field_falls_back() {
        let temp = TempDir::new().unwrap();
        let index = directory(&temp, sample_store()).index().unwrap();

        let orderings = Orderings::new(vec![SortKey::desc("score")]);
        let result = index.order_by(&orderings, &CallContext::anonymous()).unwrap();

        assert!(matches!(result, CallResult::Collection(_)));
        assert_eq!(result.keys().unwrap(), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_empty_orderings_return_view() {
        let temp = TempDir::new().unwrap();
        let index = directory(&temp, sample_store()).index().unwrap();
        let result = index
            .order_by(&Orderings::default(), &CallContext::anonymous())
            .unwrap();
        assert_eq!(result.keys().unwrap(), index.keys());
    }

    #[test]
    fn test_checksum_tracks_timestamps() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(sample_store());
        let directory = FlexDirectory::builder("accounts", store.clone(), IndexFile::for_storage(temp.path())).build();

        let before = directory.index().unwrap();
        store.insert("2", 21, Row::new()).unwrap();
        let after = directory.index().unwrap();

        assert_eq!(before.cache_key(), after.cache_key());
        assert_ne!(before.cache_checksum(), after.cache_checksum());
        assert_eq!(after.cache_checksum(), after.cache_checksum());
    }

    #[test]
    fn test_load_elements() {
        let temp = TempDir::new().unwrap();
        let index = directory(&temp, sample_store()).index().unwrap();

        let objects = index
            .load_elements(&["3".to_string(), "nope".to_string(), "1".to_string()])
            .unwrap();
        let keys: Vec<&str> = objects.iter().map(|o| o.key()).collect();
        assert_eq!(keys, vec!["3", "1"]);
        assert_eq!(index.load_element("2").unwrap().unwrap().get("score"), Some(json!(9)));
        assert!(index.load_element("nope").unwrap().is_none());
    }

    #[test]
    fn test_collection_result_without_entry_is_internal_error() {
        let temp = TempDir::new().unwrap();
        let store = sample_store();
        let mut registry = crate::cache::OperationRegistry::with_builtins();
        registry.register("stray", crate::cache::CacheScope::Global, |c, _| {
            let mut objects = c.clone().into_objects();
            objects.push(FlexObject::new("ghost", IndexEntry::new("ghost", 1), Row::new()));
            Ok(CallResult::Collection(FlexCollection::new(
                c.directory_type(),
                c.key_field(),
                objects,
            )))
        });
        let directory = FlexDirectory::builder("accounts", store, IndexFile::for_storage(temp.path()))
            .registry(registry)
            .cache(MemoryCache::new())
            .build();
        let index = directory.index().unwrap();

        let err = index.call("stray", &[], &CallContext::anonymous()).unwrap_err();
        assert!(err.is_fatal());
    }
}
