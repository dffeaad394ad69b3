//! Diesel-backed migration runner for the `SQLite` metrics store.

use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::PersistenceError;

/// Embedded Diesel migrations shipped with the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Schema version recorded by the migration that creates the metrics table.
pub const INITIAL_SCHEMA_VERSION: &str = "20260301000000";

/// Schema version recorded by the newest migration in this repository.
pub const CURRENT_SCHEMA_VERSION: &str = "20260315000000";

const BUSY_TIMEOUT_MS: u32 = 5_000;

/// A Diesel migration version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Returns the inner version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opens a connection and runs pending migrations, recording the resulting
/// schema version in telemetry.
///
/// # Errors
///
/// Returns [`PersistenceError`] when the database cannot be opened, migrations
/// fail, or the resulting schema version cannot be read.
pub fn migrate_database(
    database_url: &str,
    telemetry: &dyn TelemetrySink,
) -> Result<SchemaVersion, PersistenceError> {
    let mut connection = establish(database_url)?;
    run_migrations(&mut connection, telemetry)
}

/// Opens a connection with foreign keys and a busy timeout enabled.
pub(super) fn establish(database_url: &str) -> Result<SqliteConnection, PersistenceError> {
    let trimmed = database_url.trim();
    if trimmed.is_empty() {
        return Err(PersistenceError::BlankDatabaseUrl);
    }

    let mut connection = SqliteConnection::establish(trimmed).map_err(|error| {
        PersistenceError::ConnectionFailed {
            message: error.to_string(),
        }
    })?;

    for pragma in [
        "PRAGMA foreign_keys = ON;".to_owned(),
        format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"),
    ] {
        sql_query(pragma)
            .execute(&mut connection)
            .map(drop)
            .map_err(|error| PersistenceError::PragmaFailed {
                message: error.to_string(),
            })?;
    }

    Ok(connection)
}

/// Runs pending migrations on an open connection.
pub(super) fn run_migrations(
    connection: &mut SqliteConnection,
    telemetry: &dyn TelemetrySink,
) -> Result<SchemaVersion, PersistenceError> {
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| PersistenceError::MigrationFailed {
            message: error.to_string(),
        })?
        .len();

    let schema_version = read_schema_version(connection)?;
    info!(
        applied,
        schema_version = schema_version.as_str(),
        "database migrations complete"
    );
    telemetry.record(TelemetryEvent::SchemaVersionRecorded {
        schema_version: schema_version.as_str().to_owned(),
    });

    Ok(schema_version)
}

fn read_schema_version(
    connection: &mut SqliteConnection,
) -> Result<SchemaVersion, PersistenceError> {
    #[derive(Debug, QueryableByName)]
    struct Row {
        #[diesel(sql_type = Text)]
        version: String,
    }

    let result: Option<Row> =
        sql_query("SELECT version FROM __diesel_schema_migrations ORDER BY version DESC LIMIT 1;")
            .get_result(connection)
            .optional()
            .map_err(|error| PersistenceError::SchemaVersionQueryFailed {
                message: error.to_string(),
            })?;

    let Some(row) = result else {
        return Err(PersistenceError::MissingSchemaVersion);
    };

    Ok(SchemaVersion(row.version))
}
