//! flexindex - indexed collection cache for flat-file object stores
//!
//! A directory of stored objects gets a persisted, naturally sorted index
//! that is reconciled incrementally against the store. Index views can be
//! re-keyed and sorted on metadata alone; operations that need full
//! objects run through a fingerprinted method result cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod entry;
pub mod flex;
pub mod index;
pub mod observability;
pub mod store;
