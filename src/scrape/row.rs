//! Assembly of the persisted metric row.

use chrono::{DateTime, Utc};

use crate::github::{CommentBreakdown, PullRequestLite};

/// Metrics for one pull request, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Conversation and diff comments, including bot comments.
    pub total_comments: u64,
    /// Comments authored by bot accounts.
    pub bot_comments: u64,
    /// Additions plus deletions.
    pub lines_changed: u64,
    /// When the pull request was opened.
    pub created_at: DateTime<Utc>,
}

impl MetricRow {
    /// Primary key of the row: `"<number>:<owner>:<repo>"`.
    #[must_use]
    pub fn key(&self) -> String {
        row_key(self.number, &self.owner, &self.repo)
    }
}

/// Builds the composite key identifying a pull request across repositories.
#[must_use]
pub fn row_key(number: u64, owner: &str, repo: &str) -> String {
    format!("{number}:{owner}:{repo}")
}

/// Combines listing facts and comment counts into a [`MetricRow`].
#[must_use]
pub fn build_row(
    owner: &str,
    repo: &str,
    pull_request: &PullRequestLite,
    breakdown: CommentBreakdown,
) -> MetricRow {
    MetricRow {
        owner: owner.to_owned(),
        repo: repo.to_owned(),
        number: pull_request.number,
        total_comments: breakdown.total_comments(),
        bot_comments: breakdown.bot_comments(),
        lines_changed: pull_request.lines_changed(),
        created_at: pull_request.created_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    use super::{build_row, row_key};
    use crate::github::{CommentBreakdown, PullRequestLite};

    fn created() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200, 0).expect("timestamp should be valid")
    }

    #[rstest]
    #[case(10, 2, 12)]
    #[case(0, 0, 0)]
    #[case(u64::MAX, 1, u64::MAX)]
    fn lines_changed_sums_additions_and_deletions(
        #[case] additions: u64,
        #[case] deletions: u64,
        #[case] expected: u64,
    ) {
        let pull_request = PullRequestLite {
            number: 1,
            additions,
            deletions,
            created_at: created(),
        };

        let row = build_row("o", "r", &pull_request, CommentBreakdown::default());

        assert_eq!(row.lines_changed, expected);
    }

    #[test]
    fn build_row_copies_breakdown_and_identity() {
        let pull_request = PullRequestLite {
            number: 7,
            additions: 1,
            deletions: 1,
            created_at: created(),
        };
        let mut breakdown = CommentBreakdown::default();
        breakdown.record(true);
        breakdown.record(false);

        let row = build_row("octo", "widgets", &pull_request, breakdown);

        assert_eq!(row.key(), "7:octo:widgets");
        assert_eq!((row.total_comments, row.bot_comments), (2, 1));
        assert_eq!(row.created_at, created());
    }

    #[test]
    fn row_key_distinguishes_repositories() {
        assert_ne!(row_key(1, "octo", "a"), row_key(1, "octo", "b"));
    }
}
