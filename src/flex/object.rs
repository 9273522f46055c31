//! Hydrated objects

use serde_json::Value;

use crate::entry::{IndexEntry, FLEX_KEY, KEY, STORAGE_KEY, STORAGE_TIMESTAMP};
use crate::store::Row;

/// A stored row together with its index entry, addressed by the key of
/// the view that loaded it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexObject {
    key: String,
    entry: IndexEntry,
    data: Row,
}

impl FlexObject {
    pub fn new(key: impl Into<String>, entry: IndexEntry, data: Row) -> Self {
        Self {
            key: key.into(),
            entry,
            data,
        }
    }

    /// Key under which the loading view addressed this object
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage_key(&self) -> &str {
        &self.entry.storage_key
    }

    pub fn timestamp(&self) -> i64 {
        self.entry.storage_timestamp
    }

    pub fn entry(&self) -> &IndexEntry {
        &self.entry
    }

    pub fn data(&self) -> &Row {
        &self.data
    }

    /// Field value by name or dotted path (`address.city`).
    ///
    /// Identity fields come from the index entry; everything else is looked
    /// up in the row first and then in the entry's extra fields.
    pub fn get(&self, path: &str) -> Option<Value> {
        match path {
            STORAGE_KEY | STORAGE_TIMESTAMP | KEY => return self.entry.field(path),
            FLEX_KEY if self.entry.flex_key.is_some() => return self.entry.field(path),
            _ => {}
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first);
        for segment in segments {
            current = match current? {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
        }

        match current {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => self.entry.field(path),
        }
    }
}
