//! Domain models and the GitHub API payloads they are decoded from.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Minimal pull request facts captured once per run by the listing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestLite {
    /// Pull request number within the repository.
    pub number: u64,
    /// Lines added.
    pub additions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PullRequestLite {
    /// Total lines touched by the pull request.
    #[must_use]
    pub const fn lines_changed(&self) -> u64 {
        self.additions.saturating_add(self.deletions)
    }
}

/// Comment counts for one pull request.
///
/// Fields are private so that `bot_comments <= total_comments` can only be
/// upheld through [`CommentBreakdown::record`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentBreakdown {
    total_comments: u64,
    bot_comments: u64,
}

impl CommentBreakdown {
    /// Counts one comment, flagging it as bot-authored when `is_bot` is set.
    pub const fn record(&mut self, is_bot: bool) {
        self.total_comments = self.total_comments.saturating_add(1);
        if is_bot {
            self.bot_comments = self.bot_comments.saturating_add(1);
        }
    }

    /// Number of comments of any kind.
    #[must_use]
    pub const fn total_comments(&self) -> u64 {
        self.total_comments
    }

    /// Number of comments authored by bot accounts.
    #[must_use]
    pub const fn bot_comments(&self) -> u64 {
        self.bot_comments
    }
}

/// An account reference as embedded in GitHub payloads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
}

impl ApiUser {
    pub(crate) fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("Bot")
    }
}

/// A pull request as returned by the REST list and detail endpoints.
///
/// The list endpoint omits line deltas, so they are optional here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) number: u64,
    pub(crate) additions: Option<u64>,
    pub(crate) deletions: Option<u64>,
    pub(crate) created_at: DateTime<Utc>,
}

impl ApiPullRequest {
    /// Converts into a [`PullRequestLite`] when both line deltas are present.
    pub(crate) fn into_lite(self) -> Option<PullRequestLite> {
        Some(PullRequestLite {
            number: self.number,
            additions: self.additions?,
            deletions: self.deletions?,
            created_at: self.created_at,
        })
    }
}

/// A comment that can be attributed to an author and a pull request.
pub(crate) trait CommentRecord {
    /// The author, if GitHub still reports one.
    fn author(&self) -> Option<&ApiUser>;

    /// The owning pull request number, derived from the comment's URLs.
    fn pull_request_number(&self) -> Option<u64>;
}

/// A conversation comment from the issues comment endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIssueComment {
    pub(crate) user: Option<ApiUser>,
    pub(crate) issue_url: Option<String>,
}

impl CommentRecord for ApiIssueComment {
    fn author(&self) -> Option<&ApiUser> {
        self.user.as_ref()
    }

    fn pull_request_number(&self) -> Option<u64> {
        self.issue_url.as_deref().and_then(trailing_number)
    }
}

/// A diff comment from the pull request review comment endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReviewComment {
    pub(crate) user: Option<ApiUser>,
    pub(crate) pull_request_url: Option<String>,
    pub(crate) html_url: Option<String>,
}

impl CommentRecord for ApiReviewComment {
    fn author(&self) -> Option<&ApiUser> {
        self.user.as_ref()
    }

    fn pull_request_number(&self) -> Option<u64> {
        self.pull_request_url
            .as_deref()
            .and_then(trailing_number)
            .or_else(|| self.html_url.as_deref().and_then(trailing_number))
    }
}

/// Parses the last numeric path segment of a URL.
///
/// Query strings and fragments are ignored, as are trailing slashes, so
/// `https://github.com/o/r/pull/7/files#r1` does not resolve but
/// `https://api.github.com/repos/o/r/pulls/7/` resolves to `7`.
#[must_use]
pub fn trailing_number(url: &str) -> Option<u64> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let path = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<u64>().ok())
}
