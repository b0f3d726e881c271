#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OneMap clients used to measure driving distance to a carpark.
//!
//! Three capabilities are wrapped here:
//!
//! 1. **Token** ([`auth`]): exchanges account credentials for a bearer
//!    token. Called once per ranking request.
//! 2. **Reverse geocoding** ([`reverse_geocode`]): turns a carpark's SVY21
//!    point into a routable WGS84 coordinate.
//! 3. **Routing** ([`route`]): driving distance between two coordinates.
//!
//! [`OneMapClient`] bundles them behind the [`RoutingService`] trait so the
//! ranking pipeline can be exercised against fakes.
//!
//! See <https://www.onemap.gov.sg/apidocs/>

pub mod auth;
pub mod config;
pub mod reverse_geocode;
pub mod route;

use async_trait::async_trait;
use spot_on_carpark_models::{LatLon, PlanarPoint};
use thiserror::Error;

pub use config::OneMapConfig;

/// Errors from OneMap operations.
#[derive(Debug, Error)]
pub enum OneMapError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// OneMap answered with a non-success status.
    #[error("OneMap returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// No credentials were configured for the token endpoint.
    #[error("OneMap credentials not configured (set ONEMAP_EMAIL and ONEMAP_PASSWORD)")]
    MissingCredentials,
}

/// A OneMap bearer token.
///
/// Read-only once acquired; cloned into every concurrent resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for `Authorization: Bearer` headers.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// OneMap account credentials.
#[derive(Clone)]
pub struct OneMapCredentials {
    /// Registered account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl std::fmt::Debug for OneMapCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneMapCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reads OneMap credentials from environment variables.
///
/// Returns `Some` only when **both** `ONEMAP_EMAIL` and `ONEMAP_PASSWORD`
/// are set and non-empty.
#[must_use]
pub fn credentials_from_env() -> Option<OneMapCredentials> {
    let email = std::env::var("ONEMAP_EMAIL").ok()?;
    let password = std::env::var("ONEMAP_PASSWORD").ok()?;
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some(OneMapCredentials { email, password })
}

/// Token, reverse-geocoding and routing capabilities.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Acquires a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`OneMapError`] if no token could be obtained.
    async fn access_token(&self) -> Result<AccessToken, OneMapError>;

    /// Resolves an SVY21 point to the first-ranked WGS84 coordinate nearby.
    ///
    /// Returns `Ok(None)` when nothing lies within the search buffer.
    ///
    /// # Errors
    ///
    /// Returns [`OneMapError`] if the request or response parsing fails.
    async fn reverse_geocode(
        &self,
        token: &AccessToken,
        point: PlanarPoint,
    ) -> Result<Option<LatLon>, OneMapError>;

    /// Driving distance in metres from `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns [`OneMapError`] if the request or response parsing fails.
    async fn route_distance(
        &self,
        token: &AccessToken,
        start: LatLon,
        end: LatLon,
    ) -> Result<f64, OneMapError>;
}

/// [`RoutingService`] backed by the OneMap HTTP API.
#[derive(Debug, Clone)]
pub struct OneMapClient {
    client: reqwest::Client,
    config: OneMapConfig,
    credentials: Option<OneMapCredentials>,
}

impl OneMapClient {
    /// Creates a client with an explicit HTTP client and configuration.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        config: OneMapConfig,
        credentials: Option<OneMapCredentials>,
    ) -> Self {
        Self {
            client,
            config,
            credentials,
        }
    }

    /// Creates a client using the embedded configuration and credentials
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`OneMapError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, OneMapError> {
        let config = OneMapConfig::embedded();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let credentials = credentials_from_env();
        if credentials.is_none() {
            log::warn!("ONEMAP_EMAIL/ONEMAP_PASSWORD not set; distance resolution will fail");
        }
        Ok(Self::new(client, config, credentials))
    }

    /// The endpoint configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OneMapConfig {
        &self.config
    }
}

#[async_trait]
impl RoutingService for OneMapClient {
    async fn access_token(&self) -> Result<AccessToken, OneMapError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(OneMapError::MissingCredentials)?;
        auth::request_token(&self.client, &self.config.token_url(), credentials).await
    }

    async fn reverse_geocode(
        &self,
        token: &AccessToken,
        point: PlanarPoint,
    ) -> Result<Option<LatLon>, OneMapError> {
        reverse_geocode::reverse_geocode_xy(
            &self.client,
            &self.config.reverse_geocode_url(),
            token,
            point,
            self.config.reverse_geocode_buffer_m,
        )
        .await
    }

    async fn route_distance(
        &self,
        token: &AccessToken,
        start: LatLon,
        end: LatLon,
    ) -> Result<f64, OneMapError> {
        route::total_distance(
            &self.client,
            &self.config.route_url(),
            token,
            start,
            end,
            &self.config.route_type,
        )
        .await
    }
}

/// Maps rate limiting and other non-success statuses to errors.
pub(crate) fn check_status(resp: &reqwest::Response) -> Result<(), OneMapError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(OneMapError::RateLimited);
    }
    if !status.is_success() {
        return Err(OneMapError::Status {
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// Reads a value that OneMap may encode as a number or a numeric string.
pub(crate) fn as_number(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ0eXAiOiJKV1Qi");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
        assert_eq!(token.as_str(), "eyJ0eXAiOiJKV1Qi");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = OneMapCredentials {
            email: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("ops@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn coordinates_accept_numbers_and_strings() {
        assert_eq!(as_number(&serde_json::json!(1.3)), Some(1.3));
        assert_eq!(as_number(&serde_json::json!("103.85")), Some(103.85));
        assert_eq!(as_number(&serde_json::json!("n/a")), None);
        assert_eq!(as_number(&serde_json::json!(null)), None);
    }

    #[tokio::test]
    async fn token_without_credentials_fails() {
        let client = OneMapClient::new(reqwest::Client::new(), OneMapConfig::embedded(), None);
        assert!(matches!(
            client.access_token().await,
            Err(OneMapError::MissingCredentials)
        ));
    }
}
