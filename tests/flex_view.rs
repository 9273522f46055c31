//! Flex Index View Tests
//!
//! Tests for view invariants:
//! - Re-keying never mutates the source view
//! - Re-keying through an intermediate field equals re-keying directly
//! - Multi-key sorts are stable and honor declaration order
//! - Unknown sort fields fall back to a materialized collection

use std::collections::BTreeMap;
use std::sync::Arc;

use flexindex::cache::CallContext;
use flexindex::entry::IndexEntry;
use flexindex::flex::{CallResult, FlexDirectory, FlexIndex, Orderings, SortKey};
use flexindex::index::IndexFile;
use flexindex::observability::MemoryObserver;
use flexindex::store::{MemoryStore, Row};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

fn people(temp: &TempDir) -> (Arc<MemoryStore>, FlexIndex) {
    let store = Arc::new(MemoryStore::new());
    let rows = [
        ("u1", json!({"email": "carol@x.org", "slug": "carol", "age": 40, "city": "Oslo"})),
        ("u2", json!({"email": "alice@x.org", "slug": "alice", "age": 31, "city": "Bergen"})),
        ("u3", json!({"email": "bob@x.org", "slug": "bob", "age": 35, "city": "Oslo"})),
    ];
    for (i, (key, value)) in rows.iter().enumerate() {
        store.insert(*key, 100 + i as i64, row(value.clone())).unwrap();
    }

    let directory = FlexDirectory::builder("users", store.clone(), IndexFile::for_storage(temp.path()))
        .indexed_fields(vec!["email".into(), "slug".into(), "city".into()])
        .observer(Arc::new(MemoryObserver::new()))
        .build();
    let index = directory.index().unwrap();
    (store, index)
}

/// Content of a view ignoring key order: storage_key -> view key.
fn content(index: &FlexIndex) -> BTreeMap<String, String> {
    index
        .entries()
        .iter()
        .map(|(key, entry)| (entry.storage_key.clone(), key.clone()))
        .collect()
}

// =============================================================================
// Re-keying
// =============================================================================

/// Re-keying returns a new view and leaves the source alone.
#[test]
fn test_rekey_is_copy_on_view() {
    let temp = TempDir::new().unwrap();
    let (_store, index) = people(&temp);
    let before = index.entries().clone();

    let by_email = index.with_key_field(Some("email"));

    assert_eq!(index.entries(), &before);
    assert_eq!(index.key_field(), "storage_key");
    assert_eq!(by_email.key_field(), "email");
    assert!(by_email.meta_data("alice@x.org").is_some());
}

/// with_key_field(f2) . with_key_field(f1) == with_key_field(f2).
#[test]
fn test_rekey_round_trip() {
    let temp = TempDir::new().unwrap();
    let (_store, index) = people(&temp);

    for (f1, f2) in [("email", "slug"), ("slug", "storage_key"), ("flex_key", "email"), ("key", "slug")] {
        let through = index.with_key_field(Some(f1)).with_key_field(Some(f2));
        let direct = index.with_key_field(Some(f2));
        assert_eq!(content(&through), content(&direct), "{} -> {}", f1, f2);
    }
}

/// The default re-key field is `key`.
#[test]
fn test_rekey_default_field() {
    let temp = TempDir::new().unwrap();
    let (_store, index) = people(&temp);

    let by_key = index.with_key_field(None);
    assert_eq!(by_key.key_field(), "key");
    assert_eq!(by_key.keys(), index.keys());
}

// =============================================================================
// Sorting
// =============================================================================

/// Ties on the first field are broken by the second, descending.
#[test]
fn test_multi_key_metadata_sort() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store.insert("1", 1, row(json!({"a": 1, "b": 2}))).unwrap();
    store.insert("2", 1, row(json!({"a": 1, "b": 1}))).unwrap();
    store.insert("3", 1, row(json!({"a": 2, "b": 5}))).unwrap();
    let directory = FlexDirectory::builder("items", store, IndexFile::for_storage(temp.path()))
        .indexed_fields(vec!["a".into(), "b".into()])
        .observer(Arc::new(MemoryObserver::new()))
        .build();
    let index = directory.index().unwrap();

    let orderings = Orderings::new(vec![SortKey::asc("a"), SortKey::desc("b")]);
    let sorted = index
        .order_by(&orderings, &CallContext::anonymous())
        .unwrap()
        .into_index()
        .unwrap();
    assert_eq!(sorted.keys(), vec!["1", "2", "3"]);

    let orderings = Orderings::new(vec![SortKey::asc("a"), SortKey::asc("b")]);
    let sorted = index
        .order_by(&orderings, &CallContext::anonymous())
        .unwrap()
        .into_index()
        .unwrap();
    assert_eq!(sorted.keys(), vec!["2", "1", "3"]);
}

/// Equal values keep their prior order.
#[test]
fn test_sort_is_stable() {
    let temp = TempDir::new().unwrap();
    let (_store, index) = people(&temp);

    let sorted = index
        .order_by(&Orderings::new(vec![SortKey::asc("city")]), &CallContext::anonymous())
        .unwrap();
    assert_eq!(sorted.keys().unwrap(), vec!["u2", "u1", "u3"]);

    let reversed = index
        .order_by(&Orderings::new(vec![SortKey::desc("storage_key")]), &CallContext::anonymous())
        .unwrap()
        .into_index()
        .unwrap();
    let sorted = reversed
        .order_by(&Orderings::new(vec![SortKey::asc("city")]), &CallContext::anonymous())
        .unwrap();
    assert_eq!(sorted.keys().unwrap(), vec!["u2", "u3", "u1"]);
}

/// Sorting by the key field uses view keys.
#[test]
fn test_sort_by_key_field() {
    let temp = TempDir::new().unwrap();
    let (_store, index) = people(&temp);

    let by_email = index.with_key_field(Some("email"));
    let sorted = by_email
        .order_by(&Orderings::new(vec![SortKey::asc("email")]), &CallContext::anonymous())
        .unwrap();
    assert_eq!(
        sorted.keys().unwrap(),
        vec!["alice@x.org", "bob@x.org", "carol@x.org"]
    );
}

/// A field the index does not carry forces materialization.
#[test]
fn test_unknown_field_materializes() {
    let temp = TempDir::new().unwrap();
    let (store, index) = people(&temp);
    let batches = store.batches_read();

    let result = index
        .order_by(&Orderings::new(vec![SortKey::desc("age")]), &CallContext::anonymous())
        .unwrap();

    assert!(matches!(result, CallResult::Collection(_)));
    assert_eq!(result.keys().unwrap(), vec!["u1", "u3", "u2"]);
    assert_eq!(store.batches_read(), batches + 1);
}

// =============================================================================
// Loading
// =============================================================================

/// Loaded objects carry the view key and their entry.
#[test]
fn test_load_element_by_view_key() {
    let temp = TempDir::new().unwrap();
    let (_store, index) = people(&temp);
    let by_slug = index.with_key_field(Some("slug"));

    let bob = by_slug.load_element("bob").unwrap().unwrap();
    assert_eq!(bob.key(), "bob");
    assert_eq!(bob.storage_key(), "u3");
    assert_eq!(bob.get("age"), Some(json!(35)));
    assert_eq!(bob.entry(), &IndexEntry::new("u3", 102)
        .with_field("email", json!("bob@x.org"))
        .with_field("slug", json!("bob"))
        .with_field("city", json!("Oslo")));
}
