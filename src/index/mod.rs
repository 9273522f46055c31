//! Persisted index and its reconciliation
//!
//! The index is derived state: a sorted metadata summary of every object
//! in an entry store, kept on disk so a warm start only re-reads rows whose
//! timestamp changed.
//!
//! # Invariants
//!
//! - Every indexed `storage_key` is listed by the store, or was when the
//!   index was last written
//! - The persisted index is sorted by key in natural order
//! - The index file is only written while its exclusive lock is held
//! - One reconciliation issues at most one row batch read

mod document;
mod errors;
mod file;
mod reconciler;

pub use document::{checksum_of, IndexDocument, INDEX_FORMAT_VERSION};
pub use errors::{
    IndexError, IndexFileError, IndexFileResult, IndexLoadError, IndexResult, RowLoadError,
};
pub use file::{IndexFile, IndexLock, INDEX_DIR, INDEX_FILE_NAME};
pub use reconciler::{ReconcilePlan, Reconciler, Reconciliation};
