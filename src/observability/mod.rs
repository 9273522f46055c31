//! Observability for the index and cache layers
//!
//! Provides:
//! - Structured logging (JSON, one line per event)
//! - Typed events and the index change summary
//! - The `Observer` collaborator that reconciliation and the method cache
//!   report to
//! - Counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Reporting never fails the caller
//! 3. No background threads

mod events;
mod logger;
mod metrics;
mod observer;

pub use events::{ChangeSummary, Event};
pub use logger::{format_line, Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use observer::{LogObserver, MemoryObserver, Observation, Observer};
