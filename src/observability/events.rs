//! Observable events of the index and cache layers
//!
//! Events are explicit and typed; the string form is what lands in the
//! `event` field of a log line.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Index lifecycle
    /// Persisted index read from disk
    IndexLoaded,
    /// Persisted index missing or unreadable, starting empty
    IndexLoadFailed,
    /// Reconciliation found nothing to do
    IndexUpToDate,
    /// Reconciliation rewrote the index
    IndexUpdated,
    /// A row failed to load during reconciliation or materialization
    RowLoadFailed,

    // Method cache
    /// Cached result returned
    CacheHit,
    /// Result computed and stored
    CacheMiss,
    /// Cache backend get/set failed, call ran uncached
    CacheFailed,
    /// Operation is not cacheable
    CallUncached,

    // Lifecycle
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::IndexLoaded => "INDEX_LOADED",
            Event::IndexLoadFailed => "INDEX_LOAD_FAILED",
            Event::IndexUpToDate => "INDEX_UP_TO_DATE",
            Event::IndexUpdated => "INDEX_UPDATED",
            Event::RowLoadFailed => "ROW_LOAD_FAILED",

            Event::CacheHit => "CACHE_HIT",
            Event::CacheMiss => "CACHE_MISS",
            Event::CacheFailed => "CACHE_FAILED",
            Event::CallUncached => "CALL_UNCACHED",

            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::IndexLoadFailed | Event::RowLoadFailed | Event::CacheFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of one index rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSummary {
    /// Entries in the new index
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Index updated, {} objects ({} added, {} updated, {} removed).",
            self.total, self.added, self.updated, self.removed
        )
    }
}
