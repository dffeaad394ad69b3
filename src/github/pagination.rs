//! Link-header pagination for GitHub REST listings.
//!
//! GitHub advertises further pages through the `Link` response header. Each
//! listing follows `rel="next"` until the header stops providing one, which
//! avoids guessing page counts from item totals.

use http::HeaderMap;
use http::header::LINK;

/// One page of results plus the URL of the following page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items decoded from this page.
    pub items: Vec<T>,
    /// Absolute URL of the next page.
    pub next: Option<String>,
    /// `X-RateLimit-Remaining` reported alongside this page.
    pub rate_remaining: Option<u32>,
}

impl<T> Page<T> {
    /// Creates a page with no rate limit information.
    #[must_use]
    pub const fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self {
            items,
            next,
            rate_remaining: None,
        }
    }

    /// Sets the remaining request quota reported with the page.
    #[must_use]
    pub const fn with_rate_remaining(mut self, rate_remaining: Option<u32>) -> Self {
        self.rate_remaining = rate_remaining;
        self
    }

    /// Returns true if this is the last page.
    #[must_use]
    pub const fn is_last_page(&self) -> bool {
        self.next.is_none()
    }
}

/// Extracts the `rel="next"` target from a response's `Link` header.
#[must_use]
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .find_map(parse_next_entry)
}

fn parse_next_entry(entry: &str) -> Option<String> {
    let mut parts = entry.split(';');
    let target = parts.next()?.trim();
    let is_next = parts.any(|param| {
        let normalised = param.trim().replace(' ', "");
        normalised == "rel=\"next\"" || normalised == "rel=next"
    });
    if !is_next {
        return None;
    }
    target
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue};
    use rstest::rstest;

    use super::{Page, next_link};

    fn link_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "link",
            HeaderValue::from_str(value).expect("link header should be valid"),
        );
        headers
    }

    #[test]
    fn next_link_finds_next_among_other_relations() {
        let headers = link_headers(concat!(
            "<https://api.github.com/repositories/1/pulls?page=1>; rel=\"prev\", ",
            "<https://api.github.com/repositories/1/pulls?page=3>; rel=\"next\", ",
            "<https://api.github.com/repositories/1/pulls?page=9>; rel=\"last\""
        ));

        assert_eq!(
            next_link(&headers).as_deref(),
            Some("https://api.github.com/repositories/1/pulls?page=3")
        );
    }

    #[rstest]
    #[case::last_page("<https://api.github.com/x?page=1>; rel=\"first\"")]
    #[case::malformed_target("https://api.github.com/x?page=2; rel=\"next\"")]
    fn next_link_is_absent_without_a_well_formed_next(#[case] value: &str) {
        assert_eq!(next_link(&link_headers(value)), None);
    }

    #[test]
    fn next_link_is_absent_without_header() {
        assert_eq!(next_link(&HeaderMap::new()), None);
    }

    #[test]
    fn page_without_next_is_last() {
        let page = Page::new(vec![1_u64, 2], None).with_rate_remaining(Some(42));

        assert!(page.is_last_page());
        assert_eq!(page.rate_remaining, Some(42));
    }
}
