//! Local persistence and database migrations.
//!
//! Metric rows land in a local `SQLite` database. The schema is managed with
//! Diesel migrations so a database created by an older build is upgraded in
//! place.

mod error;
mod metric_store;
mod migrator;

pub use error::PersistenceError;
pub use metric_store::{MetricSink, SqliteMetricStore};
pub use migrator::{
    CURRENT_SCHEMA_VERSION, INITIAL_SCHEMA_VERSION, SchemaVersion, migrate_database,
};
