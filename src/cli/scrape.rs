//! Repository scrape operation.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use prtally::telemetry::{StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
use prtally::{
    ApiGateway, BackoffPolicy, GitHubPullRequestSource, OctocrabTransport, PrTallyConfig,
    ScrapeError, ScrapeRequest, ScrapeSummary, SqliteMetricStore, run_scrape,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::map_persistence_error;

/// Scrapes the configured repository into the configured database.
///
/// # Errors
///
/// Returns [`ScrapeError::Configuration`] for missing or invalid settings and
/// propagates listing, persistence and cancellation failures.
pub async fn run(config: &PrTallyConfig, cancel: &CancellationToken) -> Result<(), ScrapeError> {
    let locator = config.repository_locator()?;
    let strategy = config.listing_strategy()?;
    let database_url = config
        .require_database_url()
        .map_err(map_persistence_error)?;

    let telemetry = StderrJsonlTelemetrySink;
    let store = SqliteMetricStore::open(database_url, &telemetry).map_err(map_persistence_error)?;

    let token = config.resolve_token();
    if token.is_none() {
        warn!("no GitHub token configured, requests are unauthenticated");
    }
    let transport = OctocrabTransport::for_locator(token.as_ref(), &locator).map_err(|error| {
        ScrapeError::Configuration {
            message: error.to_string(),
        }
    })?;
    let gateway = ApiGateway::new(transport, BackoffPolicy::default(), cancel.clone());
    let source = GitHubPullRequestSource::new(gateway, strategy);

    let request = ScrapeRequest::new(locator)
        .with_concurrency(config.concurrency)
        .with_report_elapsed(config.time);
    let summary = run_scrape(Arc::new(source), Arc::new(store), &request, cancel).await?;

    if let Some(elapsed) = summary.elapsed {
        telemetry.record(TelemetryEvent::ScrapeTimed {
            owner: request.locator().owner().as_str().to_owned(),
            repo: request.locator().repository().as_str().to_owned(),
            duration_ms: duration_millis(elapsed),
            processed: summary.processed,
            errors: summary.errors,
        });
    }
    write_summary(&summary)
}

fn duration_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn write_summary(summary: &ScrapeSummary) -> Result<(), ScrapeError> {
    let mut stdout = io::stdout().lock();
    let mut message = format!(
        "Scraped {} pull requests: {} rows written, {} failed",
        summary.total, summary.inserted, summary.errors
    );
    if let Some(elapsed) = summary.elapsed {
        message.push_str(&format!("\nElapsed: {} ms", duration_millis(elapsed)));
    }

    writeln!(stdout, "{message}").map_err(|error| ScrapeError::Io {
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use prtally::{PrTallyConfig, ScrapeError};
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::{duration_millis, run};

    #[rstest]
    #[case::no_repository(PrTallyConfig {
        database_url: Some("prtally.sqlite".to_owned()),
        ..Default::default()
    })]
    #[case::no_database(PrTallyConfig {
        owner: Some("octo".to_owned()),
        repo: Some("widgets".to_owned()),
        ..Default::default()
    })]
    #[case::bad_listing(PrTallyConfig {
        owner: Some("octo".to_owned()),
        repo: Some("widgets".to_owned()),
        listing: "soap".to_owned(),
        ..Default::default()
    })]
    #[tokio::test]
    async fn incomplete_configuration_fails_before_any_work(#[case] config: PrTallyConfig) {
        let result = run(&config, &CancellationToken::new()).await;

        assert!(
            matches!(result, Err(ScrapeError::Configuration { .. })),
            "expected Configuration error, got {result:?}"
        );
    }

    #[test]
    fn elapsed_is_reported_in_whole_milliseconds() {
        assert_eq!(duration_millis(Duration::from_micros(1_500_900)), 1_500);
    }
}
