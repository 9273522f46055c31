//! Method result cache
//!
//! Results of operations called through an index view are cached under a
//! fingerprint of the call and of the index state it ran on. Index-like
//! results are stored as index entries and re-keyed to the caller's key
//! field on a hit.
//!
//! Backend failures are reported and otherwise ignored: a call always
//! returns its live result when the cache cannot serve or store it.

mod backend;
mod entry;
mod errors;
mod fingerprint;
mod registry;

pub use backend::{validate_key, CacheBackend, FileCache, MemoryCache};
pub use entry::{CacheEntry, CachedPayload, CACHE_ENTRY_VERSION};
pub use errors::{CacheError, CacheResult};
pub use fingerprint::{sha256_hex, Fingerprint};
pub use registry::{
    CacheScope, CallContext, Operation, OperationRegistry, COUNT, FILTER_BY, ORDER_BY, SLICE,
};
