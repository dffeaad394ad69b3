//! Errors raised by a scrape run and by its individual jobs.

use thiserror::Error;

use crate::github::GatewayError;
use crate::persistence::PersistenceError;

/// Failure of a single pull request job. Never aborts the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// Counting comments for the pull request failed.
    #[error("failed to count comments: {0}")]
    Comments(GatewayError),

    /// Writing the metric row failed.
    #[error("failed to persist metrics: {0}")]
    Persist(PersistenceError),

    /// The job referenced a number missing from the listing.
    #[error("pull request #{number} was not part of the listing")]
    UnknownPullRequest {
        /// The unexpected number.
        number: u64,
    },

    /// The run was cancelled before the job finished.
    #[error("job cancelled")]
    Cancelled,
}

/// Failure of a whole scrape run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScrapeError {
    /// Listing pull requests failed after retries.
    #[error("failed to list pull requests: {0}")]
    Listing(GatewayError),

    /// Required settings were missing or invalid.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// What was wrong.
        message: String,
    },

    /// The metrics store could not be opened or migrated.
    #[error(transparent)]
    Persistence(PersistenceError),

    /// The external cancellation signal fired.
    #[error("scrape cancelled")]
    Cancelled,

    /// Local I/O failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail.
        message: String,
    },

    /// The workers stopped before every job reported back.
    #[error("scrape ended after {received} of {expected} results")]
    Incomplete {
        /// Results the run waited for.
        expected: u64,
        /// Results actually received.
        received: u64,
    },
}

impl From<PersistenceError> for ScrapeError {
    fn from(error: PersistenceError) -> Self {
        Self::Persistence(error)
    }
}

impl From<GatewayError> for JobError {
    fn from(error: GatewayError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Comments(error)
        }
    }
}

impl From<GatewayError> for ScrapeError {
    fn from(error: GatewayError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Listing(error)
        }
    }
}
