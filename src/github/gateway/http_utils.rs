//! Shared HTTP utilities for gateway implementations.

use std::time::Duration;

use http::header::{HeaderMap, HeaderValue, RETRY_AFTER};

pub(super) fn header_to_string(header_value: Option<&HeaderValue>) -> Option<String> {
    header_value
        .and_then(|raw| raw.to_str().ok())
        .map(ToOwned::to_owned)
}

pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

/// Reads `Retry-After` in its delta-seconds form.
///
/// GitHub never sends the HTTP-date form, so an unparsable value is ignored.
pub(super) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_to_string(headers.get(RETRY_AFTER))
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::{HeaderMap, HeaderValue};
    use rstest::rstest;

    use super::{extract_github_message, retry_after};

    #[rstest]
    #[case::seconds("30", Some(Duration::from_secs(30)))]
    #[case::http_date("Wed, 21 Oct 2015 07:28:00 GMT", None)]
    fn retry_after_accepts_delta_seconds(#[case] raw: &'static str, #[case] expected: Option<Duration>) {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static(raw));

        assert_eq!(retry_after(&headers), expected);
    }

    #[rstest]
    #[case::github_error(r#"{"message":"Not Found"}"#, Some("Not Found"))]
    #[case::no_message(r#"{"errors":[]}"#, None)]
    #[case::not_json("<html>bad gateway</html>", None)]
    fn extract_github_message_reads_message_field(
        #[case] body: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(extract_github_message(body).as_deref(), expected);
    }
}
