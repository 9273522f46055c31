//! Operation results

use serde_json::Value;

use super::collection::FlexCollection;
use super::view::FlexIndex;

/// What an operation call returned.
///
/// A cache hit on an index-like result always comes back as `Index`, even
/// when the live call produced a `Collection`: the cache never stores
/// hydrated objects.
#[derive(Debug, Clone)]
pub enum CallResult {
    Index(FlexIndex),
    Collection(FlexCollection),
    Value(Value),
}

impl CallResult {
    /// Keys of an index-like result in result order
    pub fn keys(&self) -> Option<Vec<String>> {
        match self {
            CallResult::Index(index) => Some(index.keys()),
            CallResult::Collection(collection) => Some(collection.keys()),
            CallResult::Value(_) => None,
        }
    }

    pub fn is_index_like(&self) -> bool {
        !matches!(self, CallResult::Value(_))
    }

    pub fn into_index(self) -> Option<FlexIndex> {
        match self {
            CallResult::Index(index) => Some(index),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<FlexCollection> {
        match self {
            CallResult::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            CallResult::Value(value) => Some(value),
            _ => None,
        }
    }
}
