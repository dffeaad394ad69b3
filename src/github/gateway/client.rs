//! Octocrab-backed transport.

use async_trait::async_trait;
use http::Uri;
use octocrab::Octocrab;
use octocrab::service::middleware::retry::RetryConfig;

use crate::github::error::GatewayError;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};

use super::error_mapping::map_octocrab_error;
use super::{GitHubTransport, RawResponse};

/// Builds an Octocrab client rooted at the API origin.
///
/// `origin` must carry no path: Octocrab prefixes the base path onto every
/// request, which would push GraphQL calls under the REST root.
///
/// Octocrab's own retry layer is disabled: every retry decision belongs to
/// [`super::ApiGateway`].
///
/// # Errors
///
/// Returns `GatewayError::InvalidUrl` when the base URI cannot be parsed or
/// `GatewayError::Api` when Octocrab fails to construct a client.
pub(super) fn build_octocrab_client(
    token: Option<&PersonalAccessToken>,
    origin: &str,
) -> Result<Octocrab, GatewayError> {
    let base_uri: Uri = origin
        .parse::<Uri>()
        .map_err(|error| GatewayError::InvalidUrl(error.to_string()))?;

    let builder = Octocrab::builder().add_retry_config(RetryConfig::None);
    let authenticated = match token {
        Some(value) => builder.personal_token(value.as_ref()),
        None => builder,
    };

    authenticated
        .base_uri(base_uri)
        .map_err(|error| GatewayError::Api {
            status: 0,
            message: format!("build client failed: {error}"),
        })?
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}

/// Transport issuing raw requests through Octocrab.
///
/// Non-success responses are returned as data for the gateway to classify.
pub struct OctocrabTransport {
    client: Octocrab,
}

impl OctocrabTransport {
    /// Wraps an existing Octocrab client.
    #[must_use]
    pub const fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds a transport for the repository's API host.
    ///
    /// Requests are unauthenticated when `token` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the Octocrab client cannot be constructed.
    pub fn for_locator(
        token: Option<&PersonalAccessToken>,
        locator: &RepositoryLocator,
    ) -> Result<Self, GatewayError> {
        let client = build_octocrab_client(token, &locator.origin())?;
        Ok(Self::new(client))
    }
}

fn parse_uri(target: &str) -> Result<Uri, GatewayError> {
    target
        .parse::<Uri>()
        .map_err(|error| GatewayError::InvalidUrl(error.to_string()))
}

#[async_trait]
impl GitHubTransport for OctocrabTransport {
    async fn get(&self, target: &str) -> Result<RawResponse, GatewayError> {
        let uri = parse_uri(target)?;
        let response = self
            .client
            ._get(uri)
            .await
            .map_err(|error| map_octocrab_error("GET", &error))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|error| map_octocrab_error("GET body", &error))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    async fn post_json(
        &self,
        target: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, GatewayError> {
        let uri = parse_uri(target)?;
        let response = self
            .client
            ._post(uri, Some(body))
            .await
            .map_err(|error| map_octocrab_error("POST", &error))?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = self
            .client
            .body_to_string(response)
            .await
            .map_err(|error| map_octocrab_error("POST body", &error))?;
        Ok(RawResponse {
            status,
            headers,
            body: text,
        })
    }
}
