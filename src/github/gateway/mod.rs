//! Resilient access to the GitHub API.
//!
//! [`GitHubTransport`] issues one raw request and hands back whatever GitHub
//! answered. [`ApiGateway`] wraps a transport with classification and the
//! [`BackoffPolicy`] retry loop, and races every call and sleep against the
//! run's cancellation token.

mod classify;
mod client;
mod error_mapping;
mod http_utils;


pub use client::OctocrabTransport;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::github::backoff::{BackoffPolicy, Decision};
use crate::github::error::GatewayError;
use crate::github::pagination::{Page, next_link};
use crate::github::rate_limit::RateLimitInfo;

use self::classify::{Failure, classify_graphql, classify_response, classify_transport};

/// A GitHub response with its body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Rate limit headers carried by the response, if any.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        RateLimitInfo::from_headers(&self.headers)
    }
}

/// A single-shot HTTP transport to GitHub.
///
/// Implementations must return non-success responses as `Ok` so that the
/// gateway can classify them; `Err` is reserved for requests that produced
/// no response at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubTransport: Send + Sync {
    /// Issues a GET against an API path or absolute URL.
    async fn get(&self, target: &str) -> Result<RawResponse, GatewayError>;

    /// Issues a POST with a JSON body against an API path or absolute URL.
    async fn post_json(
        &self,
        target: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, GatewayError>;
}

#[derive(Debug, Clone, Copy)]
enum Request<'a> {
    Get(&'a str),
    GraphQl(&'a str, &'a serde_json::Value),
}

impl Request<'_> {
    async fn send<T: GitHubTransport + ?Sized>(
        self,
        transport: &T,
    ) -> Result<RawResponse, GatewayError> {
        match self {
            Self::Get(target) => transport.get(target).await,
            Self::GraphQl(target, body) => transport.post_json(target, body).await,
        }
    }

    fn classify(self, operation: &str, response: &RawResponse) -> Option<Failure> {
        classify_response(operation, response).or_else(|| match self {
            Self::Get(_) => None,
            Self::GraphQl(..) => classify_graphql(operation, response),
        })
    }
}

#[derive(serde::Deserialize)]
struct GraphQlData<R> {
    data: Option<R>,
}

/// GitHub access with classification, retries and cancellation.
pub struct ApiGateway<T> {
    transport: Option<T>,
    policy: BackoffPolicy,
    cancel: CancellationToken,
}

impl<T: GitHubTransport> ApiGateway<T> {
    /// Creates a gateway over `transport`.
    #[must_use]
    pub const fn new(transport: T, policy: BackoffPolicy, cancel: CancellationToken) -> Self {
        Self {
            transport: Some(transport),
            policy,
            cancel,
        }
    }

    /// Creates a gateway with no transport; every call fails with
    /// `GatewayError::ClientNotInitialised`.
    #[must_use]
    pub const fn unconfigured(policy: BackoffPolicy, cancel: CancellationToken) -> Self {
        Self {
            transport: None,
            policy,
            cancel,
        }
    }

    /// The retry policy in force.
    #[must_use]
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Issues a GET and returns the successful response.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the policy gives up, or
    /// `GatewayError::Cancelled` when the run is cancelled.
    pub async fn get(&self, operation: &str, target: &str) -> Result<RawResponse, GatewayError> {
        self.execute(operation, Request::Get(target)).await
    }

    /// Issues a GET and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// As [`Self::get`], plus `GatewayError::Decode` for malformed bodies.
    pub async fn get_json<R: DeserializeOwned>(
        &self,
        operation: &str,
        target: &str,
    ) -> Result<R, GatewayError> {
        let response = self.get(operation, target).await?;
        decode(operation, &response.body)
    }

    /// Fetches one page of a REST listing.
    ///
    /// # Errors
    ///
    /// As [`Self::get_json`].
    pub async fn get_page<R: DeserializeOwned>(
        &self,
        operation: &str,
        target: &str,
    ) -> Result<Page<R>, GatewayError> {
        let response = self.get(operation, target).await?;
        let items: Vec<R> = decode(operation, &response.body)?;
        let rate_remaining = response.rate_limit().map(|info| info.remaining());
        Ok(Page::new(items, next_link(&response.headers)).with_rate_remaining(rate_remaining))
    }

    /// Runs a GraphQL request and decodes its `data` member.
    ///
    /// # Errors
    ///
    /// As [`Self::get_json`]; GraphQL `errors` are classified like HTTP
    /// failures.
    pub async fn graphql<R: DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<(R, Option<RateLimitInfo>), GatewayError> {
        let response = self
            .execute(operation, Request::GraphQl(endpoint, body))
            .await?;
        let envelope: GraphQlData<R> = decode(operation, &response.body)?;
        let data = envelope.data.ok_or_else(|| GatewayError::Decode {
            operation: operation.to_owned(),
            message: "response carried no data".to_owned(),
        })?;
        Ok((data, response.rate_limit()))
    }

    async fn execute(
        &self,
        operation: &str,
        request: Request<'_>,
    ) -> Result<RawResponse, GatewayError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(GatewayError::ClientNotInitialised)?;
        let mut attempt: u32 = 0;
        // Only server errors and transient failures count toward the cap.
        let mut capped_attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
            attempt = attempt.saturating_add(1);

            let outcome = tokio::select! {
                () = self.cancel.cancelled() => return Err(GatewayError::Cancelled),
                outcome = request.send(transport) => outcome,
            };

            let failure = match outcome {
                Ok(response) => match request.classify(operation, &response) {
                    None => return Ok(response),
                    Some(failure) => failure,
                },
                Err(error) => classify_transport(error),
            };
            if BackoffPolicy::is_capped(failure.kind) {
                capped_attempts = capped_attempts.saturating_add(1);
            }

            match self
                .policy
                .decide(failure.kind, capped_attempts, &failure.hint, Utc::now())
            {
                Decision::Retry(wait) => {
                    warn!(
                        operation,
                        attempt,
                        kind = ?failure.kind,
                        sleep_ms = millis(wait),
                        error = %failure.error,
                        "retrying GitHub call"
                    );
                    self.pause(wait).await?;
                }
                Decision::GiveUp => {
                    return Err(self.give_up(operation, capped_attempts, failure));
                }
            }
        }
    }

    async fn pause(&self, wait: Duration) -> Result<(), GatewayError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(GatewayError::Cancelled),
            () = tokio::time::sleep(wait) => Ok(()),
        }
    }

    fn give_up(&self, operation: &str, attempt: u32, failure: Failure) -> GatewayError {
        if BackoffPolicy::is_capped(failure.kind) && attempt >= self.policy.max_attempts {
            debug!(operation, attempt, "retry ceiling reached");
            return GatewayError::RetriesExhausted {
                operation: operation.to_owned(),
                attempts: attempt,
                last: failure.error.to_string(),
            };
        }
        failure.error
    }
}

fn decode<R: DeserializeOwned>(operation: &str, body: &str) -> Result<R, GatewayError> {
    serde_json::from_str(body).map_err(|error| GatewayError::Decode {
        operation: operation.to_owned(),
        message: error.to_string(),
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
