//! The pull request data source consumed by the scrape pipeline.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::comments::CommentAggregator;
use super::error::GatewayError;
use super::gateway::{ApiGateway, GitHubTransport};
use super::listing::{BulkLister, ListingStrategy};
use super::locator::RepositoryLocator;
use super::models::{CommentBreakdown, PullRequestLite};

/// Everything the scrape pipeline needs from GitHub.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Lists every pull request in the repository once.
    async fn list_pull_requests(
        &self,
        locator: &RepositoryLocator,
    ) -> Result<Vec<PullRequestLite>, GatewayError>;

    /// Counts comments for every wanted pull request in one repository pass.
    async fn repository_breakdowns(
        &self,
        locator: &RepositoryLocator,
        wanted: &HashSet<u64>,
    ) -> Result<HashMap<u64, CommentBreakdown>, GatewayError>;

    /// Counts comments for a single pull request.
    async fn pull_request_breakdown(
        &self,
        locator: &RepositoryLocator,
        number: u64,
    ) -> Result<CommentBreakdown, GatewayError>;
}

/// [`PullRequestSource`] backed by the GitHub API.
pub struct GitHubPullRequestSource<T> {
    gateway: ApiGateway<T>,
    strategy: ListingStrategy,
}

impl<T: GitHubTransport> GitHubPullRequestSource<T> {
    /// Creates a source over `gateway` listing with `strategy`.
    #[must_use]
    pub const fn new(gateway: ApiGateway<T>, strategy: ListingStrategy) -> Self {
        Self { gateway, strategy }
    }
}

#[async_trait]
impl<T: GitHubTransport> PullRequestSource for GitHubPullRequestSource<T> {
    async fn list_pull_requests(
        &self,
        locator: &RepositoryLocator,
    ) -> Result<Vec<PullRequestLite>, GatewayError> {
        BulkLister::new(&self.gateway)
            .list(locator, self.strategy)
            .await
    }

    async fn repository_breakdowns(
        &self,
        locator: &RepositoryLocator,
        wanted: &HashSet<u64>,
    ) -> Result<HashMap<u64, CommentBreakdown>, GatewayError> {
        CommentAggregator::new(&self.gateway)
            .repository_breakdowns(locator, wanted)
            .await
    }

    async fn pull_request_breakdown(
        &self,
        locator: &RepositoryLocator,
        number: u64,
    ) -> Result<CommentBreakdown, GatewayError> {
        CommentAggregator::new(&self.gateway)
            .pull_request_breakdown(locator, number)
            .await
    }
}
