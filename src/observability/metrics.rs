//! Counters for the index and method cache
//!
//! - Counters only, monotonic
//! - Relaxed atomics; exactness across threads is not required

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Reconciliations that rewrote the index
    index_updates: AtomicU64,
    /// Reconciliations that found nothing to do
    index_up_to_date: AtomicU64,
    /// `read_rows` batches issued
    row_batches: AtomicU64,
    /// Rows requested across all batches
    rows_read: AtomicU64,
    /// Rows that failed to load
    row_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    /// Backend get/set failures
    cache_failures: AtomicU64,
    /// Calls that bypassed the cache
    uncached_calls: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub index_updates: u64,
    pub index_up_to_date: u64,
    pub row_batches: u64,
    pub rows_read: u64,
    pub row_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_failures: u64,
    pub uncached_calls: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_index_updates(&self) {
        self.index_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_index_up_to_date(&self) {
        self.index_up_to_date.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one batch read of `rows` rows
    pub fn record_row_batch(&self, rows: usize) {
        self.row_batches.fetch_add(1, Ordering::Relaxed);
        self.rows_read.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn increment_row_failures(&self) {
        self.row_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_failures(&self) {
        self.cache_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_uncached_calls(&self) {
        self.uncached_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            index_updates: self.index_updates.load(Ordering::Relaxed),
            index_up_to_date: self.index_up_to_date.load(Ordering::Relaxed),
            row_batches: self.row_batches.load(Ordering::Relaxed),
            rows_read: self.rows_read.load(Ordering::Relaxed),
            row_failures: self.row_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
            uncached_calls: self.uncached_calls.load(Ordering::Relaxed),
        }
    }
}
