//! Error types exposed by the GitHub access layer.

use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while building requests for, or communicating with, GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// A request was issued through a gateway with no configured client.
    #[error("GitHub client is not initialised")]
    ClientNotInitialised,

    /// The API base or a request path could not be parsed.
    #[error("GitHub URL is invalid: {0}")]
    InvalidUrl(String),

    /// The repository owner or name was blank.
    #[error("repository must be identified by a non-empty owner and name")]
    MissingPathSegments,

    /// A personal access token was supplied but was blank.
    #[error("personal access token must not be blank")]
    MissingToken,

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-retryable API error.
    #[error("GitHub API error ({status}): {message}")]
    Api {
        /// HTTP status code of the failed response.
        status: u16,
        /// Response detail from GitHub describing the failure.
        message: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        /// Logical operation whose response was malformed.
        operation: String,
        /// Deserialisation error detail.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// GitHub reported the primary rate limit as exhausted.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimited {
        /// Rate limit info if available from response headers.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub.
        message: String,
    },

    /// GitHub asked the client to slow down (secondary limit or abuse detection).
    #[error("GitHub throttled the request: {message}")]
    Throttled {
        /// Error message from GitHub.
        message: String,
    },

    /// A retryable failure persisted past the attempt ceiling.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Logical operation that kept failing.
        operation: String,
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Rendered form of the last failure observed.
        last: String,
    },

    /// The run was cancelled while this call was in flight or waiting.
    #[error("GitHub call cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Returns true when the error reports cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
