//! Pull request metrics table backed by `SQLite`.
//!
//! Rows are keyed by `"<number>:<owner>:<repo>"` and written with an upsert,
//! so replaying a job overwrites its row instead of duplicating it. A single
//! connection is shared behind a mutex and every write runs on Tokio's
//! blocking pool.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;

use crate::scrape::MetricRow;
use crate::telemetry::TelemetrySink;

use super::PersistenceError;
use super::migrator::{establish, run_migrations};

const METRICS_TABLE: &str = "pull_request_metrics";

/// Destination for computed metric rows.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Inserts the row, or overwrites the row with the same key.
    async fn upsert(&self, row: &MetricRow) -> Result<(), PersistenceError>;
}

/// `SQLite` implementation of [`MetricSink`].
#[derive(Clone)]
pub struct SqliteMetricStore {
    connection: Arc<Mutex<SqliteConnection>>,
}

#[derive(Debug, QueryableByName)]
struct StoredRow {
    #[diesel(sql_type = Text)]
    owner: String,
    #[diesel(sql_type = Text)]
    repo: String,
    #[diesel(sql_type = BigInt)]
    pr_number: i64,
    #[diesel(sql_type = BigInt)]
    comment_count: i64,
    #[diesel(sql_type = BigInt)]
    bot_comments: i64,
    #[diesel(sql_type = BigInt)]
    lines_changed: i64,
    #[diesel(sql_type = Text)]
    created_at: String,
}

impl StoredRow {
    fn into_metric_row(self) -> Result<MetricRow, PersistenceError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|error| PersistenceError::QueryFailed {
                message: format!("invalid created_at '{}': {error}", self.created_at),
            })?
            .with_timezone(&Utc);
        Ok(MetricRow {
            owner: self.owner,
            repo: self.repo,
            number: from_i64(self.pr_number),
            total_comments: from_i64(self.comment_count),
            bot_comments: from_i64(self.bot_comments),
            lines_changed: from_i64(self.lines_changed),
            created_at,
        })
    }
}

impl SqliteMetricStore {
    /// Opens the database and applies any pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the database cannot be opened or
    /// migrated.
    pub fn open(
        database_url: &str,
        telemetry: &dyn TelemetrySink,
    ) -> Result<Self, PersistenceError> {
        let mut connection = establish(database_url)?;
        run_migrations(&mut connection, telemetry)?;
        Ok(Self::from_connection(connection))
    }

    /// Opens the database without touching its schema.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the database cannot be opened.
    pub fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        establish(database_url).map(Self::from_connection)
    }

    fn from_connection(connection: SqliteConnection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteConnection>, PersistenceError> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::ConnectionPoisoned)
    }

    /// Writes a row on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::SchemaNotInitialised`] when the table is
    /// missing, or `WriteFailed` when the statement fails.
    pub fn upsert_blocking(&self, row: &MetricRow) -> Result<(), PersistenceError> {
        let mut connection = self.lock()?;

        sql_query(
            "INSERT INTO pull_request_metrics \
             (row_key, pr_number, owner, repo, comment_count, bot_comments, lines_changed, \
              created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(row_key) DO UPDATE SET \
               pr_number = excluded.pr_number, \
               owner = excluded.owner, \
               repo = excluded.repo, \
               comment_count = excluded.comment_count, \
               bot_comments = excluded.bot_comments, \
               lines_changed = excluded.lines_changed, \
               created_at = excluded.created_at, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<Text, _>(row.key())
        .bind::<BigInt, _>(to_i64(row.number))
        .bind::<Text, _>(row.owner.as_str())
        .bind::<Text, _>(row.repo.as_str())
        .bind::<BigInt, _>(to_i64(row.total_comments))
        .bind::<BigInt, _>(to_i64(row.bot_comments))
        .bind::<BigInt, _>(to_i64(row.lines_changed))
        .bind::<Text, _>(row.created_at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(&mut *connection)
        .map(drop)
        .map_err(|error| map_write_error(&mut connection, &error))
    }

    /// Returns every row stored for a repository, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the schema is missing or the query
    /// fails.
    pub fn rows_for_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<MetricRow>, PersistenceError> {
        let mut connection = self.lock()?;

        let rows: Vec<StoredRow> = sql_query(
            "SELECT owner, repo, pr_number, comment_count, bot_comments, lines_changed, \
             created_at \
             FROM pull_request_metrics \
             WHERE owner = ? AND repo = ? \
             ORDER BY pr_number;",
        )
        .bind::<Text, _>(owner)
        .bind::<Text, _>(repo)
        .load(&mut *connection)
        .map_err(|error| map_query_error(&mut connection, &error))?;

        rows.into_iter().map(StoredRow::into_metric_row).collect()
    }

    /// Counts all rows in the metrics table.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the schema is missing or the query
    /// fails.
    pub fn count_rows(&self) -> Result<u64, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let mut connection = self.lock()?;
        let row: Row = sql_query("SELECT COUNT(*) AS count FROM pull_request_metrics;")
            .get_result(&mut *connection)
            .map_err(|error| map_query_error(&mut connection, &error))?;
        Ok(from_i64(row.count))
    }
}

#[async_trait]
impl MetricSink for SqliteMetricStore {
    async fn upsert(&self, row: &MetricRow) -> Result<(), PersistenceError> {
        let store = self.clone();
        let owned = row.clone();
        tokio::task::spawn_blocking(move || store.upsert_blocking(&owned))
            .await
            .map_err(|error| PersistenceError::WriteFailed {
                message: format!("blocking write task failed: {error}"),
            })?
    }
}

// Counts and numbers are `u64` but Diesel's `BigInt` binding uses `i64`.
fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_i64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn metrics_table_exists(connection: &mut SqliteConnection) -> Result<bool, diesel::result::Error> {
    #[derive(Debug, QueryableByName)]
    struct Row {
        #[diesel(sql_type = BigInt)]
        count: i64,
    }

    let row: Row =
        sql_query("SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?;")
            .bind::<Text, _>(METRICS_TABLE)
            .get_result(connection)?;

    Ok(row.count > 0)
}

fn map_error_with_schema_check<F>(
    connection: &mut SqliteConnection,
    error: &diesel::result::Error,
    create_error: F,
) -> PersistenceError
where
    F: Fn(String) -> PersistenceError,
{
    match metrics_table_exists(connection) {
        Ok(false) => PersistenceError::SchemaNotInitialised,
        Ok(true) => create_error(error.to_string()),
        Err(check_error) => create_error(format!(
            "schema presence check failed: {check_error}; original error: {error}"
        )),
    }
}

fn map_query_error(
    connection: &mut SqliteConnection,
    error: &diesel::result::Error,
) -> PersistenceError {
    map_error_with_schema_check(connection, error, |message| {
        PersistenceError::QueryFailed { message }
    })
}

fn map_write_error(
    connection: &mut SqliteConnection,
    error: &diesel::result::Error,
) -> PersistenceError {
    map_error_with_schema_check(connection, error, |message| {
        PersistenceError::WriteFailed { message }
    })
}
