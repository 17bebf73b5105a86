//! # Error Reporting Sink
//!
//! Subscriber failures during `publish` are isolated: they never abort the
//! fan-out and are never returned to the publisher. They land here instead.

use messenger_types::QualifiedName;
use parking_lot::Mutex;
use tracing::error;

/// Receives subscriber failures from the event bus.
pub trait ErrorReporter: Send + Sync {
    /// Report one failed delivery of `event`.
    fn report(&self, event: &QualifiedName, error: &anyhow::Error);
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, event: &QualifiedName, err: &anyhow::Error) {
        error!(event = %event, error = %err, "Event subscriber failed");
    }
}

/// A reported subscriber failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub event: String,
    pub message: String,
}

/// Records every failure. Used by tests and boot diagnostics.
#[derive(Debug, Default)]
pub struct CollectingErrorReporter {
    reported: Mutex<Vec<ReportedError>>,
}

impl CollectingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reported(&self) -> Vec<ReportedError> {
        self.reported.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reported.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for CollectingErrorReporter {
    fn report(&self, event: &QualifiedName, err: &anyhow::Error) {
        self.reported.lock().push(ReportedError {
            event: event.to_string(),
            message: format!("{err:#}"),
        });
    }
}
