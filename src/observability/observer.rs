//! Observer: the sink index and cache layers report to
//!
//! Observers are passed in explicitly. Reporting never fails the caller.

use std::error::Error;
use std::sync::Mutex;

use super::events::{ChangeSummary, Event};
use super::logger::{Logger, Severity};

/// Receives change notifications, soft errors and debug messages.
pub trait Observer {
    /// A reconciliation rewrote the index
    fn index_updated(&self, summary: &ChangeSummary);

    /// A soft failure that did not abort the operation
    fn report(&self, event: Event, error: &dyn Error);

    /// Diagnostic message
    fn debug(&self, event: Event, message: &str);
}

/// Observer writing structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver {
    logger: Logger,
}

impl LogObserver {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Observer for LogObserver {
    fn index_updated(&self, summary: &ChangeSummary) {
        let total = summary.total.to_string();
        let added = summary.added.to_string();
        let updated = summary.updated.to_string();
        let removed = summary.removed.to_string();
        let message = summary.to_string();
        self.logger.info(
            Event::IndexUpdated.as_str(),
            &[
                ("added", &added),
                ("message", &message),
                ("removed", &removed),
                ("total", &total),
                ("updated", &updated),
            ],
        );
    }

    fn report(&self, event: Event, error: &dyn Error) {
        let message = error.to_string();
        let severity = if event.is_failure() {
            Severity::Error
        } else {
            Severity::Warn
        };
        self.logger.log(severity, event.as_str(), &[("message", &message)]);
    }

    fn debug(&self, event: Event, message: &str) {
        self.logger.trace(event.as_str(), &[("message", message)]);
    }
}

/// One recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    IndexUpdated(ChangeSummary),
    Reported { event: Event, message: String },
    Debug { event: Event, message: String },
}

/// Observer that records everything in memory.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    observations: Mutex<Vec<Observation>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, observation: Observation) {
        if let Ok(mut observations) = self.observations.lock() {
            observations.push(observation);
        }
    }

    /// Everything recorded so far, oldest first
    pub fn observations(&self) -> Vec<Observation> {
        self.observations
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    /// Change notifications only
    pub fn updates(&self) -> Vec<ChangeSummary> {
        self.observations()
            .into_iter()
            .filter_map(|o| match o {
                Observation::IndexUpdated(summary) => Some(summary),
                _ => None,
            })
            .collect()
    }

    /// Messages reported under `event`
    pub fn reported(&self, event: Event) -> Vec<String> {
        self.observations()
            .into_iter()
            .filter_map(|o| match o {
                Observation::Reported { event: e, message } if e == event => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Number of debug messages recorded under `event`
    pub fn debug_count(&self, event: Event) -> usize {
        self.observations()
            .iter()
            .filter(|o| matches!(o, Observation::Debug { event: e, .. } if *e == event))
            .count()
    }

    pub fn clear(&self) {
        if let Ok(mut observations) = self.observations.lock() {
            observations.clear();
        }
    }
}

impl Observer for MemoryObserver {
    fn index_updated(&self, summary: &ChangeSummary) {
        self.push(Observation::IndexUpdated(*summary));
    }

    fn report(&self, event: Event, error: &dyn Error) {
        self.push(Observation::Reported {
            event,
            message: error.to_string(),
        });
    }

    fn debug(&self, event: Event, message: &str) {
        self.push(Observation::Debug {
            event,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_memory_observer_records_in_order() {
        let observer = MemoryObserver::new();
        let summary = ChangeSummary {
            total: 1,
            added: 1,
            updated: 0,
            removed: 0,
        };

        observer.debug(Event::IndexUpToDate, "nothing to do");
        observer.index_updated(&summary);
        observer.report(
            Event::RowLoadFailed,
            &io::Error::new(io::ErrorKind::Other, "bad row"),
        );

        assert_eq!(observer.observations().len(), 3);
        assert_eq!(observer.updates(), vec![summary]);
        assert_eq!(observer.reported(Event::RowLoadFailed), vec!["bad row".to_string()]);
        assert!(observer.reported(Event::CacheFailed).is_empty());
        assert_eq!(observer.debug_count(Event::IndexUpToDate), 1);

        observer.clear();
        assert!(observer.observations().is_empty());
    }

    #[test]
    fn test_log_observer_does_not_panic() {
        let observer = LogObserver::new(Logger::new(Severity::Fatal));
        observer.index_updated(&ChangeSummary::default());
        observer.report(Event::CacheFailed, &io::Error::new(io::ErrorKind::Other, "down"));
        observer.debug(Event::CacheHit, "hit");
    }
}
