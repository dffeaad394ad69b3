//! One-pass listing of every pull request in a repository.
//!
//! GraphQL is the default: a single cursor walk returns line deltas
//! alongside numbers. The REST strategy pages through `/pulls` and hydrates
//! each item from the detail endpoint because the list payload omits
//! `additions` and `deletions`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::error::GatewayError;
use super::gateway::{ApiGateway, GitHubTransport};
use super::locator::RepositoryLocator;
use super::models::{ApiPullRequest, PullRequestLite};

const PAGE_SIZE: u32 = 100;

/// Which GitHub API the listing pass uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingStrategy {
    /// Cursor pagination over the GraphQL API.
    #[default]
    GraphQl,
    /// Link-header pagination over the REST API with per-item hydration.
    Rest,
}

impl ListingStrategy {
    /// Returns the configuration spelling of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GraphQl => "graphql",
            Self::Rest => "rest",
        }
    }
}

impl fmt::Display for ListingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "graphql" => Ok(Self::GraphQl),
            "rest" => Ok(Self::Rest),
            other => Err(format!(
                "unknown listing strategy '{other}', expected 'graphql' or 'rest'"
            )),
        }
    }
}

const PULL_REQUESTS_QUERY: &str = r"
query($owner: String!, $name: String!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: 100, after: $after, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes { number additions deletions createdAt }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_requests: PullRequestConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestConnection {
    #[serde(default)]
    nodes: Vec<Option<GraphQlPullRequest>>,
    page_info: GraphQlPageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPullRequest {
    number: u64,
    additions: u64,
    deletions: u64,
    created_at: DateTime<Utc>,
}

impl From<GraphQlPullRequest> for PullRequestLite {
    fn from(node: GraphQlPullRequest) -> Self {
        Self {
            number: node.number,
            additions: node.additions,
            deletions: node.deletions,
            created_at: node.created_at,
        }
    }
}

/// Accumulates listed pull requests, keeping the first sighting of each number.
#[derive(Debug, Default)]
struct Collected {
    seen: HashSet<u64>,
    items: Vec<PullRequestLite>,
}

impl Collected {
    fn push(&mut self, pull_request: PullRequestLite) {
        if self.seen.insert(pull_request.number) {
            self.items.push(pull_request);
        }
    }

    const fn len(&self) -> usize {
        self.items.len()
    }
}

/// Lists pull requests through an [`ApiGateway`].
pub struct BulkLister<'a, T> {
    gateway: &'a ApiGateway<T>,
}

impl<'a, T: GitHubTransport> BulkLister<'a, T> {
    /// Creates a lister borrowing the gateway.
    #[must_use]
    pub const fn new(gateway: &'a ApiGateway<T>) -> Self {
        Self { gateway }
    }

    /// Lists every pull request in the repository, each number exactly once.
    ///
    /// # Errors
    ///
    /// Returns the gateway error that aborted pagination.
    pub async fn list(
        &self,
        locator: &RepositoryLocator,
        strategy: ListingStrategy,
    ) -> Result<Vec<PullRequestLite>, GatewayError> {
        let collected = match strategy {
            ListingStrategy::GraphQl => self.list_graphql(locator).await?,
            ListingStrategy::Rest => self.list_rest(locator).await?,
        };
        info!(
            owner = locator.owner().as_str(),
            repo = locator.repository().as_str(),
            strategy = strategy.as_str(),
            total = collected.len(),
            "listed pull requests"
        );
        Ok(collected.items)
    }

    async fn list_graphql(
        &self,
        locator: &RepositoryLocator,
    ) -> Result<Collected, GatewayError> {
        let endpoint = locator.graphql_path();
        let mut collected = Collected::default();
        let mut cursor: Option<String> = None;
        let mut page: u32 = 0;

        loop {
            page = page.saturating_add(1);
            let body = json!({
                "query": PULL_REQUESTS_QUERY,
                "variables": {
                    "owner": locator.owner().as_str(),
                    "name": locator.repository().as_str(),
                    "after": cursor,
                },
            });
            let (data, rate_limit): (RepositoryData, _) = self
                .gateway
                .graphql("list pull requests", &endpoint, &body)
                .await?;
            let connection = data
                .repository
                .ok_or_else(|| GatewayError::Api {
                    status: 404,
                    message: format!(
                        "repository {}/{} not found",
                        locator.owner().as_str(),
                        locator.repository().as_str()
                    ),
                })?
                .pull_requests;

            let page_count = connection.nodes.len();
            for node in connection.nodes.into_iter().flatten() {
                collected.push(node.into());
            }
            debug!(
                page,
                page_count,
                total_so_far = collected.len(),
                rate_remaining = rate_limit.map(|info| info.remaining()),
                "fetched pull request page"
            );

            match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => return Ok(collected),
            }
        }
    }

    async fn list_rest(&self, locator: &RepositoryLocator) -> Result<Collected, GatewayError> {
        let mut collected = Collected::default();
        let mut target = Some(format!(
            "{}?state=all&sort=created&direction=desc&per_page={PAGE_SIZE}&page=1",
            locator.pulls_path()
        ));
        let mut page: u32 = 0;

        while let Some(current) = target {
            page = page.saturating_add(1);
            let listing = self
                .gateway
                .get_page::<ApiPullRequest>("list pull requests", &current)
                .await?;
            let page_count = listing.items.len();
            for item in listing.items {
                if collected.seen.contains(&item.number) {
                    continue;
                }
                let lite = self.hydrate(locator, item).await?;
                collected.push(lite);
            }
            debug!(
                page,
                page_count,
                total_so_far = collected.len(),
                rate_remaining = listing.rate_remaining,
                "fetched pull request page"
            );
            target = listing.next;
        }
        Ok(collected)
    }

    async fn hydrate(
        &self,
        locator: &RepositoryLocator,
        item: ApiPullRequest,
    ) -> Result<PullRequestLite, GatewayError> {
        let number = item.number;
        if let Some(lite) = item.into_lite() {
            return Ok(lite);
        }
        let detail: ApiPullRequest = self
            .gateway
            .get_json("pull request", &locator.pull_request_path(number))
            .await?;
        detail.into_lite().ok_or_else(|| GatewayError::Decode {
            operation: "pull request".to_owned(),
            message: format!("pull request #{number} carried no line counts"),
        })
    }
}
