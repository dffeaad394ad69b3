//! Database migration operations.

use prtally::persistence::migrate_database;
use prtally::telemetry::StderrJsonlTelemetrySink;
use prtally::{PrTallyConfig, ScrapeError};
use tracing::info;

use super::map_persistence_error;

/// Runs database migrations.
///
/// # Errors
///
/// Returns [`ScrapeError::Configuration`] if the database URL is missing or
/// blank, and [`ScrapeError::Persistence`] for connection or migration
/// failures.
pub fn run(config: &PrTallyConfig) -> Result<(), ScrapeError> {
    let database_url = config
        .require_database_url()
        .map_err(map_persistence_error)?;

    let telemetry = StderrJsonlTelemetrySink;
    let schema_version =
        migrate_database(database_url, &telemetry).map_err(map_persistence_error)?;
    info!(
        schema_version = schema_version.as_str(),
        "database is up to date"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use prtally::{PrTallyConfig, ScrapeError};
    use rstest::rstest;
    use tempfile::TempDir;

    use super::run;

    #[rstest]
    #[case::missing_database_url(None, "database URL is required")]
    #[case::blank_database_url(Some("   ".to_owned()), "database URL must not be blank")]
    fn migrate_db_rejects_invalid_database_url(
        #[case] database_url: Option<String>,
        #[case] expected_message_prefix: &str,
    ) {
        let config = PrTallyConfig {
            database_url,
            migrate_db: true,
            ..Default::default()
        };

        let result = run(&config);

        match result {
            Err(ScrapeError::Configuration { message }) => {
                assert!(
                    message.starts_with(expected_message_prefix),
                    "expected message starting with {expected_message_prefix:?}, got {message:?}"
                );
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn migrate_db_creates_the_database() {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let database_path = temp_dir.path().join("prtally.sqlite");
        let config = PrTallyConfig {
            database_url: Some(database_path.to_string_lossy().into_owned()),
            migrate_db: true,
            ..Default::default()
        };

        run(&config).expect("migration should succeed");

        assert!(database_path.exists());
    }
}
