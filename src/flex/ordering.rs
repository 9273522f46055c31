//! Sort specifications and multi-key stable sorting
//!
//! An ordering is a list of `(field, direction)` pairs, earliest pair most
//! significant. Sorting applies one stable pass per pair, from the last
//! pair to the first, so ties on an earlier field keep the relative order
//! left by the later fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::compare_values;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

/// One sort key, serialized as `["field", "ASC"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey(pub String, pub Direction);

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey(field.into(), Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortKey(field.into(), Direction::Desc)
    }

    pub fn field(&self) -> &str {
        &self.0
    }

    pub fn direction(&self) -> Direction {
        self.1
    }
}

impl FromStr for SortKey {
    type Err = String;

    /// Parses `field` or `field:asc` / `field:desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.rsplit_once(':') {
            Some((field, direction)) => (field, direction.parse()?),
            None => (s, Direction::Asc),
        };
        if field.is_empty() {
            return Err(format!("empty sort field in '{}'", s));
        }
        Ok(SortKey(field.to_string(), direction))
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Orderings(Vec<SortKey>);

impl Orderings {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Orderings(keys)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SortKey> {
        self.0.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(SortKey::field)
    }

    /// JSON form used as an operation argument.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|k| Value::Array(vec![Value::from(k.0.clone()), Value::from(k.1.to_string())]))
                .collect(),
        )
    }

    /// Parses an operation argument.
    ///
    /// Accepts `[["field", "DESC"], ...]`, `["field:desc", ...]` and
    /// `{"field": "DESC", ...}`. Object keys are taken in declaration order.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.parse(),
                    Value::Array(_) => {
                        serde_json::from_value::<SortKey>(item.clone()).map_err(|e| e.to_string())
                    }
                    other => Err(format!("invalid sort key {}", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Orderings),
            Value::Object(map) => map
                .iter()
                .map(|(field, direction)| {
                    let direction = direction
                        .as_str()
                        .ok_or_else(|| format!("invalid direction for '{}'", field))?
                        .parse()?;
                    Ok(SortKey(field.clone(), direction))
                })
                .collect::<Result<Vec<_>, String>>()
                .map(Orderings),
            other => Err(format!("invalid orderings {}", other)),
        }
    }
}

impl FromIterator<SortKey> for Orderings {
    fn from_iter<T: IntoIterator<Item = SortKey>>(iter: T) -> Self {
        Orderings(iter.into_iter().collect())
    }
}

/// Sorts `items` in place by `orderings`.
///
/// `value_of` returns the sort value of an item for a field, `None` when
/// the item has no such field.
pub fn sort_by_orderings<T, F>(items: &mut Vec<T>, orderings: &Orderings, value_of: F)
where
    F: Fn(&T, &str) -> Option<Value>,
{
    for key in orderings.iter().rev() {
        let mut decorated: Vec<(Option<Value>, T)> = items
            .drain(..)
            .map(|item| (value_of(&item, key.field()), item))
            .collect();

        // sort_by is stable
        decorated.sort_by(|(a, _), (b, _)| {
            let ordering = compare_values(a.as_ref(), b.as_ref());
            match key.direction() {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        });

        items.extend(decorated.into_iter().map(|(_, item)| item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sort_key() {
        assert_eq!("name".parse::<SortKey>().unwrap(), SortKey::asc("name"));
        assert_eq!("age:DESC".parse::<SortKey>().unwrap(), SortKey::desc("age"));
        assert!("age:sideways".parse::<SortKey>().is_err());
        assert!(":desc".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_value_forms() {
        let expected = Orderings::new(vec![SortKey::asc("a"), SortKey::desc("b")]);

        assert_eq!(Orderings::from_value(&json!([["a", "ASC"], ["b", "DESC"]])).unwrap(), expected);
        assert_eq!(Orderings::from_value(&json!(["a", "b:desc"])).unwrap(), expected);
        assert_eq!(Orderings::from_value(&expected.to_value()).unwrap(), expected);
        assert!(Orderings::from_value(&json!(5)).is_err());
        assert!(Orderings::from_value(&json!([["a", "UP"]])).is_err());
    }

    #[test]
    fn test_object_form_keeps_declared_order() {
        let orderings = Orderings::from_value(&json!({"b": "ASC", "a": "desc"})).unwrap();

        assert_eq!(orderings, Orderings::new(vec![SortKey::asc("b"), SortKey::desc("a")]));
        assert!(Orderings::from_value(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_first_declared_field_wins() {
        let mut rows = vec![
            json!({"id": 1, "b": 0, "a": 1}),
            json!({"id": 2, "b": 1, "a": 5}),
            json!({"id": 3, "b": 0, "a": 3}),
        ];
        let orderings = Orderings::from_value(&json!({"b": "ASC", "a": "DESC"})).unwrap();

        sort_by_orderings(&mut rows, &orderings, |row, field| row.get(field).cloned());

        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_reverse_iteration() {
        let orderings = Orderings::new(vec![SortKey::asc("a"), SortKey::desc("b")]);
        let fields: Vec<&str> = orderings.iter().rev().map(SortKey::field).collect();
        assert_eq!(fields, vec!["b", "a"]);
    }

    #[test]
    fn test_multi_key_sort() {
        let mut rows = vec![
            json!({"id": 1, "a": 2, "b": 1}),
            json!({"id": 2, "a": 1, "b": 9}),
            json!({"id": 3, "a": 2, "b": 5}),
        ];
        let orderings = Orderings::new(vec![SortKey::asc("a"), SortKey::desc("b")]);

        sort_by_orderings(&mut rows, &orderings, |row, field| row.get(field).cloned());

        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut rows = vec![
            json!({"id": "x", "a": 1}),
            json!({"id": "y", "a": 1}),
            json!({"id": "z", "a": 0}),
        ];
        let orderings = Orderings::new(vec![SortKey::asc("a")]);

        sort_by_orderings(&mut rows, &orderings, |row, field| row.get(field).cloned());

        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_missing_values_sort_first() {
        let mut rows = vec![json!({"id": 1, "a": "b"}), json!({"id": 2})];
        let orderings = Orderings::new(vec![SortKey::asc("a")]);

        sort_by_orderings(&mut rows, &orderings, |row, field| row.get(field).cloned());

        assert_eq!(rows[0]["id"], 2);
    }
}
