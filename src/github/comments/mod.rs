//! Comment counting for pull requests.
//!
//! A run first tries one bulk pass over every conversation and diff comment
//! in the repository, attributing each to its pull request by URL. Jobs whose
//! pull request is missing from that pass count comments one pull request at
//! a time.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::GatewayError;
use super::gateway::{ApiGateway, GitHubTransport};
use super::locator::RepositoryLocator;
use super::models::{ApiIssueComment, ApiReviewComment, CommentBreakdown, CommentRecord};

/// Counts comments through an [`ApiGateway`].
pub struct CommentAggregator<'a, T> {
    gateway: &'a ApiGateway<T>,
}

impl<'a, T: GitHubTransport> CommentAggregator<'a, T> {
    /// Creates an aggregator borrowing the gateway.
    #[must_use]
    pub const fn new(gateway: &'a ApiGateway<T>) -> Self {
        Self { gateway }
    }

    /// Scans every comment in the repository once.
    ///
    /// The returned map holds an entry for every number in `wanted`, zero when
    /// the pull request has no comments, since the scan covers the whole
    /// repository.
    ///
    /// # Errors
    ///
    /// Returns the gateway error that aborted either scan.
    pub async fn repository_breakdowns(
        &self,
        locator: &RepositoryLocator,
        wanted: &HashSet<u64>,
    ) -> Result<HashMap<u64, CommentBreakdown>, GatewayError> {
        let mut breakdowns: HashMap<u64, CommentBreakdown> = wanted
            .iter()
            .map(|number| (*number, CommentBreakdown::default()))
            .collect();

        let mut tally = |comment: &dyn CommentRecord| {
            let Some(author) = comment.author() else {
                return;
            };
            let Some(number) = comment.pull_request_number() else {
                return;
            };
            if let Some(breakdown) = breakdowns.get_mut(&number) {
                breakdown.record(author.is_bot());
            }
        };

        let issue_path = with_page_size(&locator.repository_issue_comments_path());
        self.scan::<ApiIssueComment>("list repository issue comments", &issue_path, &mut tally)
            .await?;
        let review_path = with_page_size(&locator.repository_review_comments_path());
        self.scan::<ApiReviewComment>("list repository review comments", &review_path, &mut tally)
            .await?;

        Ok(breakdowns)
    }

    /// Counts comments on a single pull request.
    ///
    /// # Errors
    ///
    /// Returns the gateway error that aborted either listing.
    pub async fn pull_request_breakdown(
        &self,
        locator: &RepositoryLocator,
        number: u64,
    ) -> Result<CommentBreakdown, GatewayError> {
        let mut breakdown = CommentBreakdown::default();
        let mut tally = |comment: &dyn CommentRecord| {
            if let Some(author) = comment.author() {
                breakdown.record(author.is_bot());
            }
        };

        let issue_path = with_page_size(&locator.issue_comments_path(number));
        self.scan::<ApiIssueComment>("list issue comments", &issue_path, &mut tally)
            .await?;
        let review_path = with_page_size(&locator.review_comments_path(number));
        self.scan::<ApiReviewComment>("list review comments", &review_path, &mut tally)
            .await?;

        Ok(breakdown)
    }

    async fn scan<C>(
        &self,
        operation: &str,
        first_page: &str,
        visit: &mut (dyn FnMut(&dyn CommentRecord) + Send),
    ) -> Result<(), GatewayError>
    where
        C: CommentRecord + DeserializeOwned + Send,
    {
        let mut target = Some(first_page.to_owned());
        let mut page: u32 = 0;
        while let Some(current) = target {
            page = page.saturating_add(1);
            let listing = self.gateway.get_page::<C>(operation, &current).await?;
            debug!(
                operation,
                page,
                page_count = listing.items.len(),
                rate_remaining = listing.rate_remaining,
                "fetched comment page"
            );
            for comment in &listing.items {
                visit(comment);
            }
            target = listing.next;
        }
        Ok(())
    }
}

fn with_page_size(path: &str) -> String {
    format!("{path}?per_page=100")
}
