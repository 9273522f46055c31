//! Flex Collection: hydrated objects in view order
//!
//! A collection is what index-backed operations run on. It keeps the key
//! field of the view it was loaded from so results can be mapped back onto
//! index entries.

use serde_json::Value;

use super::object::FlexObject;
use super::ordering::{sort_by_orderings, Orderings};
use crate::entry::compare_values;

#[derive(Debug, Clone, PartialEq)]
pub struct FlexCollection {
    directory_type: String,
    key_field: String,
    objects: Vec<FlexObject>,
}

impl FlexCollection {
    pub fn new(
        directory_type: impl Into<String>,
        key_field: impl Into<String>,
        objects: Vec<FlexObject>,
    ) -> Self {
        Self {
            directory_type: directory_type.into(),
            key_field: key_field.into(),
            objects,
        }
    }

    pub fn directory_type(&self) -> &str {
        &self.directory_type
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.key().to_string()).collect()
    }

    pub fn storage_keys(&self) -> Vec<String> {
        self.objects
            .iter()
            .map(|o| o.storage_key().to_string())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&FlexObject> {
        self.objects.iter().find(|o| o.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlexObject> {
        self.objects.iter()
    }

    pub fn into_objects(self) -> Vec<FlexObject> {
        self.objects
    }

    fn with_objects(&self, objects: Vec<FlexObject>) -> Self {
        Self {
            directory_type: self.directory_type.clone(),
            key_field: self.key_field.clone(),
            objects,
        }
    }

    /// Stable multi-key sort on object values.
    pub fn order_by(&self, orderings: &Orderings) -> Self {
        let mut objects = self.objects.clone();
        sort_by_orderings(&mut objects, orderings, |object, field| {
            if field == self.key_field {
                Some(Value::String(object.key().to_string()))
            } else {
                object.get(field)
            }
        });
        self.with_objects(objects)
    }

    /// Objects whose `field` equals `value`.
    ///
    /// Numbers compare by value, so `1` matches `1.0`.
    pub fn filter_by(&self, field: &str, value: &Value) -> Self {
        let objects = self
            .objects
            .iter()
            .filter(|o| {
                let found = o.get(field);
                match (found.as_ref(), value) {
                    (None, Value::Null) => true,
                    (Some(found @ Value::Number(_)), Value::Number(_)) => {
                        compare_values(Some(found), Some(value)).is_eq()
                    }
                    (Some(found), _) => found == value,
                    (None, _) => false,
                }
            })
            .cloned()
            .collect();
        self.with_objects(objects)
    }

    /// Window of `limit` objects starting at `offset`; no limit takes the rest.
    pub fn slice(&self, offset: usize, limit: Option<usize>) -> Self {
        let objects = self
            .objects
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        self.with_objects(objects)
    }
}

impl IntoIterator for FlexCollection {
    type Item = FlexObject;
    type IntoIter = std::vec::IntoIter<FlexObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}
