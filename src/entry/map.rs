//! Insertion-ordered mapping from entry key to index entry

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::compare::natural_cmp;
use super::entry::IndexEntry;

/// Ordered index: entry key -> `IndexEntry`.
///
/// Iteration follows insertion order. Re-inserting an existing key replaces
/// the entry in place without moving it. Serializes as a JSON object in
/// iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryMap {
    order: Vec<String>,
    entries: HashMap<String, IndexEntry>,
}

impl EntryMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Inserts or replaces an entry, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: IndexEntry) -> Option<IndexEntry> {
        let key = key.into();
        let previous = self.entries.insert(key.clone(), entry);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut IndexEntry> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes an entry, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &IndexEntry) -> bool,
    {
        let entries = &mut self.entries;
        self.order.retain(|key| {
            let retained = entries.get(key).map(|entry| keep(key, entry)).unwrap_or(false);
            if !retained {
                entries.remove(key);
            }
            retained
        });
    }

    /// Keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Entries in iteration order.
    pub fn values(&self) -> impl Iterator<Item = &IndexEntry> {
        self.order.iter().filter_map(move |key| self.entries.get(key))
    }

    /// (key, entry) pairs in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.order
            .iter()
            .filter_map(move |key| self.entries.get(key).map(|entry| (key, entry)))
    }

    /// Sorts by key in natural ascending order.
    pub fn sort_keys(&mut self) {
        self.order.sort_by(|a, b| natural_cmp(a, b));
    }

    /// Rearranges entries to follow `keys`.
    ///
    /// Keys not present in the map are ignored; entries not named in `keys`
    /// keep their relative order after the named ones.
    pub fn reorder<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut order = Vec::with_capacity(self.order.len());
        let mut placed = std::collections::HashSet::with_capacity(self.order.len());
        for key in keys {
            if self.entries.contains_key(&key) && placed.insert(key.clone()) {
                order.push(key);
            }
        }
        for key in &self.order {
            if !placed.contains(key) {
                order.push(key.clone());
            }
        }
        self.order = order;
    }

    /// Content view that ignores order, for comparisons.
    pub fn to_sorted(&self) -> BTreeMap<String, IndexEntry> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}

impl FromIterator<(String, IndexEntry)> for EntryMap {
    fn from_iter<T: IntoIterator<Item = (String, IndexEntry)>>(iter: T) -> Self {
        let mut map = EntryMap::new();
        for (key, entry) in iter {
            map.insert(key, entry);
        }
        map
    }
}

impl IntoIterator for EntryMap {
    type Item = (String, IndexEntry);
    type IntoIter = std::vec::IntoIter<(String, IndexEntry)>;

    fn into_iter(mut self) -> Self::IntoIter {
        let pairs: Vec<(String, IndexEntry)> = self
            .order
            .into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|entry| (key, entry)))
            .collect();
        pairs.into_iter()
    }
}

impl Serialize for EntryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, entry) in self.iter() {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

struct EntryMapVisitor;

impl<'de> Visitor<'de> for EntryMapVisitor {
    type Value = EntryMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a map of index entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EntryMap, A::Error> {
        let mut map = EntryMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, entry)) = access.next_entry::<String, IndexEntry>()? {
            map.insert(key, entry);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for EntryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntryMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(map: &EntryMap) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut map = EntryMap::new();
        map.insert("b", IndexEntry::new("b", 1));
        map.insert("a", IndexEntry::new("a", 2));
        map.insert("b", IndexEntry::new("b", 3));

        assert_eq!(keys(&map), vec!["b", "a"]);
        assert_eq!(map.get("b").unwrap().storage_timestamp, 3);
    }

    #[test]
    fn test_remove_and_retain() {
        let mut map: EntryMap = ["a", "b", "c", "d"]
            .iter()
            .map(|k| (k.to_string(), IndexEntry::new(*k, 0)))
            .collect();

        assert!(map.remove("b").is_some());
        assert!(map.remove("b").is_none());
        map.retain(|key, _| key != "d");

        assert_eq!(keys(&map), vec!["a", "c"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_sort_keys_natural() {
        let mut map: EntryMap = ["p10", "p2", "p1"]
            .iter()
            .map(|k| (k.to_string(), IndexEntry::new(*k, 0)))
            .collect();

        map.sort_keys();
        assert_eq!(keys(&map), vec!["p1", "p2", "p10"]);
    }

    #[test]
    fn test_reorder_keeps_unnamed_tail() {
        let mut map: EntryMap = ["a", "b", "c"]
            .iter()
            .map(|k| (k.to_string(), IndexEntry::new(*k, 0)))
            .collect();

        map.reorder(vec!["c".to_string(), "zz".to_string()]);
        assert_eq!(keys(&map), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_serde_preserves_order() {
        let map: EntryMap = ["zeta", "alpha"]
            .iter()
            .map(|k| (k.to_string(), IndexEntry::new(*k, 7)))
            .collect();

        let text = serde_json::to_string(&map).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());

        let back: EntryMap = serde_json::from_str(&text).unwrap();
        assert_eq!(back, map);
    }
}
