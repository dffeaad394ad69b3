//! Logging setup plus structured telemetry events and sinks.
//!
//! Diagnostic logging goes through `tracing`. Telemetry events are a separate,
//! small vocabulary of operational facts (schema version, run timing) that
//! can be captured as JSON lines for later inspection.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    /// The configured filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser detail.
        message: String,
    },

    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {message}")]
    AlreadyInitialised {
        /// Detail from `tracing-subscriber`.
        message: String,
    },
}

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `filter` is used, falling back to
/// `info`.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is malformed or a subscriber is
/// already installed.
pub fn init_logging(filter: Option<&str>) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        let directive = filter.unwrap_or(DEFAULT_LOG_FILTER);
        EnvFilter::try_new(directive).map_err(|error| TelemetryError::InvalidFilter {
            filter: directive.to_owned(),
            message: error.to_string(),
        })
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| TelemetryError::AlreadyInitialised {
            message: error.to_string(),
        })
}

/// A structured telemetry event emitted by prtally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the current database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20260315000000`).
        schema_version: String,
    },

    /// Records how long a scrape run took.
    ScrapeTimed {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
        /// Pull requests persisted.
        processed: u64,
        /// Pull requests that failed.
        errors: u64,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Test doubles for telemetry.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::Mutex;

    use super::{TelemetryEvent, TelemetrySink};

    /// Sink that keeps every event in memory.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingSink {
        /// Drains the recorded events.
        ///
        /// # Panics
        ///
        /// Panics if the events mutex is poisoned.
        #[expect(clippy::expect_used, reason = "test double")]
        #[must_use]
        pub fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .expect("events mutex should be available")
                .drain(..)
                .collect()
        }
    }

    impl TelemetrySink for RecordingSink {
        #[expect(clippy::expect_used, reason = "test double")]
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .expect("events mutex should be available")
                .push(event);
        }
    }
}
