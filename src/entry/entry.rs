//! Index entry: the metadata summary of one stored object

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the store-unique identifier of an object.
pub const STORAGE_KEY: &str = "storage_key";
/// Field holding the store-reported modification timestamp.
pub const STORAGE_TIMESTAMP: &str = "storage_timestamp";
/// Field holding the public key of an object.
pub const KEY: &str = "key";
/// Field holding the directory-qualified key (`{type}.obj:{storage_key}`).
pub const FLEX_KEY: &str = "flex_key";
/// On-disk name of the load failure flag.
pub const ERROR_FLAG: &str = "__error";

/// Fields every index knows about, whether or not the first entry carries them.
pub const DEFAULT_FIELDS: [&str; 4] = [KEY, STORAGE_KEY, STORAGE_TIMESTAMP, FLEX_KEY];

fn is_false(value: &bool) -> bool {
    !*value
}

/// Metadata for one stored object.
///
/// Identity is `storage_key`, unique within a directory's entry store.
/// Fields not known to the index are kept in `extra` and round-trip
/// through the index file unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub storage_key: String,

    pub storage_timestamp: i64,

    #[serde(default)]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex_key: Option<String>,

    /// Set when the row failed to load during reconciliation
    #[serde(default, rename = "__error", skip_serializing_if = "is_false")]
    pub load_error: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexEntry {
    /// Entry as reported by the store listing: key defaults to the storage key.
    pub fn new(storage_key: impl Into<String>, storage_timestamp: i64) -> Self {
        let storage_key = storage_key.into();
        Self {
            key: storage_key.clone(),
            storage_key,
            storage_timestamp,
            flex_key: None,
            load_error: false,
            extra: Map::new(),
        }
    }

    /// Builder-style setter for an extra field.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_field(name, value);
        self
    }

    /// Sets a field by name, routing well-known names to their typed slots.
    ///
    /// Values of the wrong type for a typed slot are ignored.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match name.as_str() {
            STORAGE_KEY => {
                if let Value::String(s) = value {
                    self.storage_key = s;
                }
            }
            STORAGE_TIMESTAMP => {
                if let Some(ts) = value.as_i64() {
                    self.storage_timestamp = ts;
                }
            }
            KEY => {
                if let Value::String(s) = value {
                    self.key = s;
                }
            }
            FLEX_KEY => {
                self.flex_key = value.as_str().map(str::to_string);
            }
            ERROR_FLAG => {
                self.load_error = value.as_bool().unwrap_or(!value.is_null());
            }
            _ => {
                self.extra.insert(name, value);
            }
        }
    }

    /// Returns the value of a field, or `None` when the entry lacks it.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            STORAGE_KEY => Some(Value::String(self.storage_key.clone())),
            STORAGE_TIMESTAMP => Some(Value::from(self.storage_timestamp)),
            KEY => Some(Value::String(self.key.clone())),
            FLEX_KEY => self.flex_key.clone().map(Value::String),
            ERROR_FLAG => self.load_error.then_some(Value::Bool(true)),
            _ => self.extra.get(name).filter(|v| !v.is_null()).cloned(),
        }
    }

    /// Names of all fields present on this entry.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![
            STORAGE_KEY.to_string(),
            STORAGE_TIMESTAMP.to_string(),
            KEY.to_string(),
        ];
        if self.flex_key.is_some() {
            names.push(FLEX_KEY.to_string());
        }
        if self.load_error {
            names.push(ERROR_FLAG.to_string());
        }
        names.extend(self.extra.keys().cloned());
        names
    }

    /// Flex key of the entry, synthesized from the directory type when absent.
    pub fn flex_key_for(&self, directory_type: &str) -> String {
        match &self.flex_key {
            Some(flex_key) => flex_key.clone(),
            None => format!("{}.obj:{}", directory_type, self.storage_key),
        }
    }
}
