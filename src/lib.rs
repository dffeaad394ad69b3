//! prtally library crate: per pull request review metrics for a GitHub
//! repository.
//!
//! A run lists every pull request once, counts conversation and diff comments
//! (separating bot accounts) with one repository-wide pass, and upserts one
//! row per pull request into a local `SQLite` database. GitHub calls go
//! through a gateway that absorbs rate limits, secondary throttling and
//! transient failures with bounded, cancellable retries.

pub mod config;
pub mod github;
pub mod persistence;
pub mod scrape;
pub mod telemetry;

pub use config::PrTallyConfig;
pub use github::{
    ApiGateway, BackoffPolicy, GatewayError, GitHubPullRequestSource, ListingStrategy,
    OctocrabTransport, PersonalAccessToken, RepositoryLocator,
};
pub use persistence::{MetricSink, PersistenceError, SqliteMetricStore};
pub use scrape::{MetricRow, ScrapeError, ScrapeRequest, ScrapeSummary, run_scrape};
