//! Index entries and their ordered container
//!
//! An index is a metadata summary of every object in an entry store. Each
//! object contributes one `IndexEntry`; the `EntryMap` holding them keeps
//! insertion order so sorted views survive serialization.

mod compare;
#[allow(clippy::module_inception)]
mod entry;
mod map;

pub use compare::{compare_values, natural_cmp, value_as_key};
pub use entry::{
    IndexEntry, DEFAULT_FIELDS, ERROR_FLAG, FLEX_KEY, KEY, STORAGE_KEY, STORAGE_TIMESTAMP,
};
pub use map::EntryMap;
