//! Error mapping helpers for the Octocrab transport.

use http::StatusCode;

use crate::github::error::GatewayError;

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Maps a failure raised by Octocrab itself, before any response was read.
///
/// Raw `_get`/`_post` calls hand back non-success responses untouched, so a
/// `GitHub` variant only appears during client construction.
pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> GatewayError {
    if let octocrab::Error::GitHub { source, .. } = error {
        let status = source.status_code;
        return if is_auth_failure(status) {
            GatewayError::Authentication {
                message: format!(
                    "{operation} failed: GitHub returned {status} {message}",
                    message = source.message
                ),
            }
        } else {
            GatewayError::Api {
                status: status.as_u16(),
                message: format!("{operation} failed: {message}", message = source.message),
            }
        };
    }

    if is_network_error(error) {
        return GatewayError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    GatewayError::Api {
        status: 0,
        message: format!("{operation} failed: {error}"),
    }
}

/// Maps a non-success HTTP response that will not be retried.
pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
) -> GatewayError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if is_auth_failure(status) {
        GatewayError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        }
    } else {
        GatewayError::Api {
            status: status.as_u16(),
            message: format!("{operation} failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;

    use super::map_http_error;
    use crate::github::error::GatewayError;

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED)]
    #[case(StatusCode::FORBIDDEN)]
    fn auth_statuses_map_to_authentication(#[case] status: StatusCode) {
        let error = map_http_error("list pulls", status, Some("Bad credentials".to_owned()));

        assert!(
            matches!(error, GatewayError::Authentication { ref message } if message.contains("Bad credentials")),
            "expected Authentication, got {error:?}"
        );
    }

    #[test]
    fn other_statuses_keep_their_code() {
        let error = map_http_error("list pulls", StatusCode::NOT_FOUND, None);

        assert_eq!(
            error,
            GatewayError::Api {
                status: 404,
                message: "list pulls failed: unknown error".to_owned(),
            }
        );
    }
}
