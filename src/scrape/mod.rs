//! The scrape pipeline: list once, count comments in bulk, then persist one
//! row per pull request through a bounded worker pool.

mod error;
mod pool;
mod progress;
mod row;
mod run;


use std::time::Duration;

use crate::github::RepositoryLocator;

pub use error::{JobError, ScrapeError};
pub use progress::{ProgressCounters, ProgressSnapshot};
pub use row::{MetricRow, build_row, row_key};
pub use run::run_scrape;

/// Workers used when the caller does not choose.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Time between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    locator: RepositoryLocator,
    concurrency: usize,
    progress_interval: Duration,
    report_elapsed: bool,
}

impl ScrapeRequest {
    /// Creates a request for `locator` with default settings.
    #[must_use]
    pub const fn new(locator: RepositoryLocator) -> Self {
        Self {
            locator,
            concurrency: DEFAULT_CONCURRENCY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            report_elapsed: false,
        }
    }

    /// Sets the worker count. Zero is treated as one.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the time between progress log lines.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Requests the elapsed wall-clock time in the summary.
    #[must_use]
    pub const fn with_report_elapsed(mut self, report_elapsed: bool) -> Self {
        self.report_elapsed = report_elapsed;
        self
    }

    /// The repository to scrape.
    #[must_use]
    pub const fn locator(&self) -> &RepositoryLocator {
        &self.locator
    }

    /// Worker count, never below one.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        if self.concurrency == 0 {
            1
        } else {
            self.concurrency
        }
    }

    /// Time between progress log lines.
    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        self.progress_interval
    }

    /// Whether the summary carries the elapsed time.
    #[must_use]
    pub const fn report_elapsed(&self) -> bool {
        self.report_elapsed
    }
}

/// Final counters of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    /// Pull requests listed.
    pub total: u64,
    /// Jobs persisted and reported back.
    pub processed: u64,
    /// Rows written.
    pub inserted: u64,
    /// Jobs that failed.
    pub errors: u64,
    /// Wall-clock duration, when requested.
    pub elapsed: Option<Duration>,
}
