//! Outcome classification for raw GitHub responses.
//!
//! REST failures are classified from the status code and headers. GraphQL
//! reports failures inside a 200 body, so its `errors[].type` is checked
//! first and the message text is only inspected when no type matches.

use http::StatusCode;
use serde::Deserialize;

use crate::github::backoff::{FailureKind, ServerHint};
use crate::github::error::GatewayError;
use crate::github::rate_limit::RateLimitInfo;

use super::RawResponse;
use super::error_mapping::map_http_error;
use super::http_utils::{extract_github_message, retry_after};

/// A classified failure ready for the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) kind: FailureKind,
    pub(crate) hint: ServerHint,
    pub(crate) error: GatewayError,
}

impl Failure {
    const fn new(kind: FailureKind, hint: ServerHint, error: GatewayError) -> Self {
        Self { kind, hint, error }
    }

    const fn fatal(error: GatewayError) -> Self {
        Self::new(FailureKind::Fatal, ServerHint::NONE, error)
    }
}

/// Classifies a REST response, returning `None` for a 2xx status.
pub(crate) fn classify_response(operation: &str, response: &RawResponse) -> Option<Failure> {
    let status = response.status;
    if status.is_success() {
        return None;
    }

    let message = extract_github_message(&response.body);
    let rate_limit = RateLimitInfo::from_headers(&response.headers);
    let hint = ServerHint {
        reset_at: rate_limit.and_then(|info| info.reset_time()),
        retry_after: retry_after(&response.headers),
    };

    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
        && let Some(failure) = classify_limit(message.as_deref(), rate_limit, hint)
    {
        return Some(failure);
    }

    if status.is_server_error() {
        return Some(Failure::new(
            FailureKind::ServerError,
            hint,
            map_http_error(operation, status, message),
        ));
    }

    Some(Failure::fatal(map_http_error(operation, status, message)))
}

fn classify_limit(
    message: Option<&str>,
    rate_limit: Option<RateLimitInfo>,
    hint: ServerHint,
) -> Option<Failure> {
    let text = message.unwrap_or_default().to_owned();
    let lowered = text.to_lowercase();
    let is_secondary = lowered.contains("secondary rate limit") || lowered.contains("abuse");
    let is_exhausted = rate_limit.is_some_and(|info| info.is_exhausted());

    if is_secondary {
        return Some(Failure::new(
            FailureKind::Throttled,
            hint,
            GatewayError::Throttled { message: text },
        ));
    }
    if is_exhausted {
        return Some(rate_limited(rate_limit, hint, text));
    }
    if hint.retry_after.is_some() {
        return Some(Failure::new(
            FailureKind::Throttled,
            hint,
            GatewayError::Throttled { message: text },
        ));
    }
    if lowered.contains("rate limit") {
        return Some(rate_limited(rate_limit, hint, text));
    }
    None
}

const fn rate_limited(
    rate_limit: Option<RateLimitInfo>,
    hint: ServerHint,
    message: String,
) -> Failure {
    Failure::new(
        FailureKind::RateLimited,
        hint,
        GatewayError::RateLimited {
            rate_limit,
            message,
        },
    )
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorBody {
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: String,
}

const TRANSIENT_MARKERS: [&str; 4] = ["rate limit", "502", "503", "504"];

/// Classifies the `errors` array of a successful GraphQL response.
///
/// Returns `None` when the body carries no errors. A body that is not JSON is
/// left for the decoder to report.
pub(crate) fn classify_graphql(operation: &str, response: &RawResponse) -> Option<Failure> {
    let parsed = serde_json::from_str::<GraphQlErrorBody>(&response.body).ok()?;
    if parsed.errors.is_empty() {
        return None;
    }

    let message = parsed
        .errors
        .iter()
        .map(|entry| entry.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let rate_limit = RateLimitInfo::from_headers(&response.headers);
    let hint = ServerHint {
        reset_at: rate_limit.and_then(|info| info.reset_time()),
        retry_after: retry_after(&response.headers),
    };

    if parsed
        .errors
        .iter()
        .any(|entry| entry.kind.as_deref() == Some("RATE_LIMITED"))
    {
        return Some(rate_limited(rate_limit, hint, message));
    }

    let lowered = message.to_lowercase();
    if TRANSIENT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return Some(Failure::new(
            FailureKind::Transient,
            hint,
            GatewayError::Network {
                message: format!("{operation} failed: {message}"),
            },
        ));
    }

    Some(Failure::fatal(GatewayError::Api {
        status: response.status.as_u16(),
        message: format!("{operation} failed: {message}"),
    }))
}

/// Classifies an error raised before any response was received.
pub(crate) const fn classify_transport(error: GatewayError) -> Failure {
    let kind = if matches!(error, GatewayError::Network { .. }) {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    };
    Failure::new(kind, ServerHint::NONE, error)
}
