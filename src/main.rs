//! prtally CLI entrypoint.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use prtally::telemetry::init_logging;
use prtally::{PrTallyConfig, ScrapeError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ScrapeError> {
    let config = load_config()?;
    init_logging(config.log_filter.as_deref()).map_err(|error| ScrapeError::Configuration {
        message: error.to_string(),
    })?;

    if config.migrate_db {
        return cli::migrations::run(&config);
    }

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));
    let outcome = cli::scrape::run(&config, &cancel).await;
    interrupt.abort();
    outcome
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`ScrapeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PrTallyConfig, ScrapeError> {
    PrTallyConfig::load().map_err(|error| ScrapeError::Configuration {
        message: error.to_string(),
    })
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling scrape");
        cancel.cancel();
    }
}
