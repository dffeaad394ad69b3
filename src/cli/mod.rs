//! CLI operation mode handlers.
//!
//! - [`migrations`]: Database schema migrations
//! - [`scrape`]: Scrape a repository into the metrics store

use prtally::{PersistenceError, ScrapeError};

pub mod migrations;
pub mod scrape;

/// Maps a persistence error to a scrape error.
///
/// Database URL problems become [`ScrapeError::Configuration`], while runtime
/// errors (connection, migration, query failures) stay
/// [`ScrapeError::Persistence`].
#[must_use]
pub fn map_persistence_error(error: PersistenceError) -> ScrapeError {
    if is_configuration_error(&error) {
        ScrapeError::Configuration {
            message: error.to_string(),
        }
    } else {
        ScrapeError::Persistence(error)
    }
}

/// Returns true if the persistence error is a configuration problem.
const fn is_configuration_error(error: &PersistenceError) -> bool {
    matches!(
        error,
        PersistenceError::MissingDatabaseUrl | PersistenceError::BlankDatabaseUrl
    )
}
