//! Application configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prtally.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRTALLY_OWNER`, `PRTALLY_TOKEN`, or legacy
//!    `GITHUB_TOKEN`
//! 4. **Command-line arguments** – `--owner`/`-o`, `--repo`/`-r`, ...
//!
//! # Configuration File
//!
//! ```toml
//! owner = "octocat"
//! repo = "hello-world"
//! token = "ghp_example"
//! database_url = "prtally.sqlite"
//! concurrency = 8
//! listing = "rest"
//! ```

use std::env;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::{ListingStrategy, PersonalAccessToken, RepositoryLocator};
use crate::persistence::PersistenceError;
use crate::scrape::{DEFAULT_CONCURRENCY, ScrapeError};

/// Public GitHub REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PRTALLY_OWNER` or `--owner`: Repository owner
/// - `PRTALLY_REPO` or `--repo`: Repository name
/// - `PRTALLY_TOKEN`, `GITHUB_TOKEN`, or `--token`: Authentication token
/// - `PRTALLY_DATABASE_URL` or `--database-url`: Local `SQLite` database path
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use prtally::PrTallyConfig;
///
/// let config = PrTallyConfig::load().expect("failed to load configuration");
/// let (owner, repo) = config.require_repository_info().expect("repository required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRTALLY",
    discovery(
        dotfile_name = ".prtally.toml",
        config_file_name = "prtally.toml",
        app_name = "prtally"
    )
)]
pub struct PrTallyConfig {
    /// Repository owner (e.g., "octocat").
    ///
    /// Can be provided via:
    /// - CLI: `--owner <OWNER>` or `-o <OWNER>`
    /// - Environment: `PRTALLY_OWNER`
    /// - Config file: `owner = "..."`
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    ///
    /// Can be provided via:
    /// - CLI: `--repo <REPO>` or `-r <REPO>`
    /// - Environment: `PRTALLY_REPO`
    /// - Config file: `repo = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Optional: public repositories can be scraped anonymously under a much
    /// lower rate limit.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PRTALLY_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// REST API root, for GitHub Enterprise (e.g.
    /// `https://ghe.example.com/api/v3`). Defaults to `api.github.com`.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Local `SQLite` database URL/path receiving the metric rows.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `PRTALLY_DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Number of pull requests processed at once. Zero is treated as one.
    #[ortho_config(cli_short = 'c')]
    pub concurrency: usize,

    /// Listing strategy, `graphql` or `rest`.
    #[ortho_config(cli_short = 'l')]
    pub listing: String,

    /// Reports the elapsed wall-clock time of the run.
    ///
    /// Note: like other booleans this is read from the CLI or a config file,
    /// not from the environment.
    #[ortho_config()]
    pub time: bool,

    /// Runs database migrations and exits.
    ///
    /// When set, prtally initialises the database at `database_url`, applies
    /// any pending Diesel migrations, records the schema version in telemetry,
    /// and exits without contacting GitHub.
    #[ortho_config()]
    pub migrate_db: bool,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[ortho_config()]
    pub log_filter: Option<String>,
}

impl Default for PrTallyConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            api_base: None,
            database_url: None,
            concurrency: DEFAULT_CONCURRENCY,
            listing: ListingStrategy::default().as_str().to_owned(),
            time: false,
            migrate_db: false,
            log_filter: None,
        }
    }
}

impl PrTallyConfig {
    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// Blank values count as absent, so `None` means requests go out
    /// unauthenticated.
    #[must_use]
    pub fn resolve_token(&self) -> Option<PersonalAccessToken> {
        self.token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .and_then(|token| PersonalAccessToken::new(token).ok())
    }

    /// Returns owner and repo if both are configured.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Configuration`] when owner or repo is missing.
    pub fn require_repository_info(&self) -> Result<(&str, &str), ScrapeError> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Ok((owner.as_str(), repo.as_str())),
            (None, _) => Err(ScrapeError::Configuration {
                message: "repository owner is required (use --owner or -o)".to_owned(),
            }),
            (_, None) => Err(ScrapeError::Configuration {
                message: "repository name is required (use --repo or -r)".to_owned(),
            }),
        }
    }

    /// Returns the database URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::MissingDatabaseUrl`] when none is set.
    pub fn require_database_url(&self) -> Result<&str, PersistenceError> {
        self.database_url
            .as_deref()
            .ok_or(PersistenceError::MissingDatabaseUrl)
    }

    /// Parses the configured listing strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Configuration`] for unknown strategies.
    pub fn listing_strategy(&self) -> Result<ListingStrategy, ScrapeError> {
        self.listing
            .parse()
            .map_err(|message| ScrapeError::Configuration { message })
    }

    /// The REST API root requests are sent to.
    #[must_use]
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// Builds the locator for the configured repository.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Configuration`] when owner or repo is missing or
    /// the API root is not a valid URL.
    pub fn repository_locator(&self) -> Result<RepositoryLocator, ScrapeError> {
        let (owner, repo) = self.require_repository_info()?;
        RepositoryLocator::with_api_base(self.api_base(), owner, repo).map_err(|error| {
            ScrapeError::Configuration {
                message: error.to_string(),
            }
        })
    }
}
