//! Entry point of a scrape run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::github::PullRequestSource;
use crate::persistence::MetricSink;

use super::error::ScrapeError;
use super::pool::{JobContext, run_jobs};
use super::progress::ProgressCounters;
use super::{ScrapeRequest, ScrapeSummary};

/// Scrapes every pull request of the requested repository into `sink`.
///
/// Lists once, counts comments with one repository-wide pass, then persists
/// one row per pull request using `request.concurrency()` workers. A failed
/// bulk comment pass falls back to per pull request counting. Individual job
/// failures are counted in the summary and never abort the run.
///
/// # Errors
///
/// Returns [`ScrapeError::Listing`] when listing fails,
/// [`ScrapeError::Cancelled`] when `cancel` fires, and
/// [`ScrapeError::Incomplete`] when workers stop before reporting every job.
pub async fn run_scrape<S, K>(
    source: Arc<S>,
    sink: Arc<K>,
    request: &ScrapeRequest,
    cancel: &CancellationToken,
) -> Result<ScrapeSummary, ScrapeError>
where
    S: PullRequestSource + 'static,
    K: MetricSink + 'static,
{
    let started = Instant::now();
    let locator = request.locator();
    let owner = locator.owner().as_str();
    let repo = locator.repository().as_str();
    info!(owner, repo, concurrency = request.concurrency(), "starting scrape");

    let listed = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        result = source.list_pull_requests(locator) => result?,
    };
    let total = u64::try_from(listed.len()).unwrap_or(u64::MAX);
    if listed.is_empty() {
        info!(owner, repo, "no pull requests to scrape");
        return Ok(finish(request, started, ScrapeSummary::default()));
    }

    let wanted: HashSet<u64> = listed.iter().map(|pull_request| pull_request.number).collect();
    let breakdowns = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        result = source.repository_breakdowns(locator, &wanted) => match result {
            Ok(breakdowns) => breakdowns,
            Err(error) if error.is_cancelled() => return Err(ScrapeError::Cancelled),
            Err(error) => {
                warn!(
                    owner,
                    repo,
                    error = %error,
                    "bulk comment scan failed; counting comments per pull request"
                );
                HashMap::new()
            }
        },
    };

    let numbers: Vec<u64> = listed.iter().map(|pull_request| pull_request.number).collect();
    let counters = Arc::new(ProgressCounters::default());
    let context = JobContext {
        source,
        sink,
        locator: locator.clone(),
        pull_requests: listed
            .into_iter()
            .map(|pull_request| (pull_request.number, pull_request))
            .collect(),
        breakdowns,
        counters: Arc::clone(&counters),
        cancel: cancel.clone(),
    };

    run_jobs(
        context,
        numbers,
        request.concurrency(),
        request.progress_interval(),
    )
    .await?;

    let snapshot = counters.snapshot(total);
    let summary = ScrapeSummary {
        total,
        processed: snapshot.processed,
        inserted: snapshot.inserted,
        errors: snapshot.errors,
        elapsed: None,
    };
    info!(
        owner,
        repo,
        total = summary.total,
        processed = summary.processed,
        inserted = summary.inserted,
        errors = summary.errors,
        "scrape complete"
    );
    Ok(finish(request, started, summary))
}

fn finish(request: &ScrapeRequest, started: Instant, summary: ScrapeSummary) -> ScrapeSummary {
    if !request.report_elapsed() {
        return summary;
    }
    ScrapeSummary {
        elapsed: Some(started.elapsed()),
        ..summary
    }
}
