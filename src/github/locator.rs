//! Repository identity wrappers and API path construction.

use url::Url;

use super::error::GatewayError;

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Result<Self, GatewayError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::MissingPathSegments);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Result<Self, GatewayError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::MissingPathSegments);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, GatewayError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(GatewayError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

/// A repository on github.com or a GitHub Enterprise host.
///
/// # Example
///
/// ```
/// use prtally::github::locator::RepositoryLocator;
///
/// let locator = RepositoryLocator::from_owner_repo("octo", "repo")
///     .expect("should create locator");
/// assert_eq!(locator.owner().as_str(), "octo");
/// assert_eq!(locator.api_base().as_str(), "https://api.github.com/");
/// assert_eq!(locator.origin(), "https://api.github.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    rest_prefix: String,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Creates a locator for a github.com repository.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::MissingPathSegments` when owner or name is blank.
    pub fn from_owner_repo(owner: &str, repo: &str) -> Result<Self, GatewayError> {
        Self::with_api_base(GITHUB_API_BASE, owner, repo)
    }

    /// Creates a locator against an explicit REST API base, such as
    /// `https://ghe.example.com/api/v3`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidUrl` when the base cannot be parsed and
    /// `GatewayError::MissingPathSegments` when owner or name is blank.
    pub fn with_api_base(api_base: &str, owner: &str, repo: &str) -> Result<Self, GatewayError> {
        let parsed = Url::parse(api_base.trim())
            .map_err(|error| GatewayError::InvalidUrl(error.to_string()))?;
        if parsed.host_str().is_none() {
            return Err(GatewayError::InvalidUrl(
                "API base must include a host".to_owned(),
            ));
        }
        let rest_prefix = parsed.path().trim_end_matches('/').to_owned();
        Ok(Self {
            api_base: parsed,
            rest_prefix,
            owner: RepositoryOwner::new(owner)?,
            repository: RepositoryName::new(repo)?,
        })
    }

    /// REST API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Scheme, host and port of the API, without any path.
    ///
    /// Clients are rooted here; every endpoint path below carries its own
    /// prefix so REST and GraphQL can live under different roots.
    #[must_use]
    pub fn origin(&self) -> String {
        self.api_base.origin().ascii_serialization()
    }

    /// Path of the GraphQL endpoint paired with the REST base.
    ///
    /// Enterprise hosts serve REST under `/api/v3` and GraphQL under
    /// `/api/graphql`; github.com serves GraphQL at `/graphql`.
    #[must_use]
    pub fn graphql_path(&self) -> String {
        self.rest_prefix.strip_suffix("/v3").map_or_else(
            || format!("{}/graphql", self.rest_prefix),
            |prefix| format!("{prefix}/graphql"),
        )
    }

    fn repo_path(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.rest_prefix,
            self.owner.as_str(),
            self.repository.as_str()
        )
    }

    /// Returns the API path for listing pull requests.
    pub(crate) fn pulls_path(&self) -> String {
        format!("{}/pulls", self.repo_path())
    }

    /// Returns the API path for a single pull request.
    pub(crate) fn pull_request_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}", self.repo_path())
    }

    /// Conversation comments on one pull request.
    pub(crate) fn issue_comments_path(&self, number: u64) -> String {
        format!("{}/issues/{number}/comments", self.repo_path())
    }

    /// Diff comments on one pull request.
    pub(crate) fn review_comments_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}/comments", self.repo_path())
    }

    /// Conversation comments across the whole repository.
    pub(crate) fn repository_issue_comments_path(&self) -> String {
        format!("{}/issues/comments", self.repo_path())
    }

    /// Diff comments across the whole repository.
    pub(crate) fn repository_review_comments_path(&self) -> String {
        format!("{}/pulls/comments", self.repo_path())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{PersonalAccessToken, RepositoryLocator};
    use crate::github::error::GatewayError;

    #[test]
    fn from_owner_repo_targets_public_github() {
        let locator =
            RepositoryLocator::from_owner_repo("octo", "widgets").expect("should build locator");

        assert_eq!(locator.api_base().as_str(), "https://api.github.com/");
        assert_eq!(locator.origin(), "https://api.github.com");
        assert_eq!(locator.pulls_path(), "/repos/octo/widgets/pulls");
        assert_eq!(locator.graphql_path(), "/graphql");
    }

    #[rstest]
    #[case::enterprise("https://ghe.example.com/api/v3")]
    #[case::trailing_slash("https://ghe.example.com/api/v3/")]
    fn enterprise_base_keeps_rest_and_graphql_roots_apart(#[case] api_base: &str) {
        let locator =
            RepositoryLocator::with_api_base(api_base, "o", "r").expect("should build locator");

        assert_eq!(locator.origin(), "https://ghe.example.com");
        assert_eq!(locator.pulls_path(), "/api/v3/repos/o/r/pulls");
        assert_eq!(locator.graphql_path(), "/api/graphql");
    }

    #[test]
    fn origin_keeps_an_explicit_port() {
        let locator = RepositoryLocator::with_api_base("http://127.0.0.1:8080/api/v3", "o", "r")
            .expect("should build locator");

        assert_eq!(locator.origin(), "http://127.0.0.1:8080");
        assert_eq!(
            locator.review_comments_path(4),
            "/api/v3/repos/o/r/pulls/4/comments"
        );
    }

    #[test]
    fn comment_paths_cover_both_scopes() {
        let locator = RepositoryLocator::from_owner_repo("o", "r").expect("should build locator");

        assert_eq!(locator.issue_comments_path(7), "/repos/o/r/issues/7/comments");
        assert_eq!(locator.review_comments_path(7), "/repos/o/r/pulls/7/comments");
        assert_eq!(
            locator.repository_issue_comments_path(),
            "/repos/o/r/issues/comments"
        );
        assert_eq!(
            locator.repository_review_comments_path(),
            "/repos/o/r/pulls/comments"
        );
        assert_eq!(locator.pull_request_path(7), "/repos/o/r/pulls/7");
    }

    #[rstest]
    #[case::blank_owner("", "repo")]
    #[case::blank_repo("owner", "  ")]
    fn blank_identity_is_rejected(#[case] owner: &str, #[case] repo: &str) {
        let result = RepositoryLocator::from_owner_repo(owner, repo);

        assert_eq!(result, Err(GatewayError::MissingPathSegments));
    }

    #[test]
    fn api_base_without_host_is_rejected() {
        let result = RepositoryLocator::with_api_base("not a url", "o", "r");

        assert!(
            matches!(result, Err(GatewayError::InvalidUrl(_))),
            "expected InvalidUrl, got {result:?}"
        );
    }

    #[test]
    fn blank_token_is_rejected() {
        assert_eq!(
            PersonalAccessToken::new("   "),
            Err(GatewayError::MissingToken)
        );
    }
}
