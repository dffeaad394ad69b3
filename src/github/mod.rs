//! GitHub access: resilient API calls, pull request listing and comment
//! counting.

pub mod backoff;
pub mod comments;
pub mod error;
pub mod gateway;
pub mod listing;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod source;

pub use backoff::{BackoffPolicy, Decision, FailureKind, ServerHint};
pub use comments::CommentAggregator;
pub use error::GatewayError;
pub use gateway::{ApiGateway, GitHubTransport, OctocrabTransport, RawResponse};
pub use listing::{BulkLister, ListingStrategy};
pub use locator::{PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner};
pub use models::{CommentBreakdown, PullRequestLite};
pub use rate_limit::RateLimitInfo;
pub use source::{GitHubPullRequestSource, PullRequestSource};
