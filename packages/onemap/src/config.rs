//! Compile-time embedded OneMap endpoint configuration.
//!
//! The endpoints live in `services/onemap.toml` and are embedded at
//! compile time. Credentials are never part of this file; see
//! [`crate::OneMapCredentials`].

use std::time::Duration;

use serde::Deserialize;

/// OneMap endpoint configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct OneMapConfig {
    /// API base URL (e.g. `"https://www.onemap.gov.sg"`).
    pub base_url: String,
    /// Path of the token endpoint.
    pub token_path: String,
    /// Path of the SVY21 reverse-geocoding endpoint.
    pub reverse_geocode_path: String,
    /// Path of the routing endpoint.
    pub route_path: String,
    /// Search radius in metres for reverse geocoding.
    pub reverse_geocode_buffer_m: u32,
    /// Route type requested from the routing endpoint.
    #[serde(default = "default_route_type")]
    pub route_type: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_route_type() -> String {
    "drive".to_string()
}

const fn default_timeout_secs() -> u64 {
    15
}

const ONEMAP_TOML: &str = include_str!("../services/onemap.toml");

impl OneMapConfig {
    /// Returns the embedded configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the config is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        toml::de::from_str(ONEMAP_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded OneMap config: {e}"))
    }

    /// Returns a copy pointing at a different base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, self.token_path)
    }

    /// Full reverse-geocoding endpoint URL.
    #[must_use]
    pub fn reverse_geocode_url(&self) -> String {
        format!("{}{}", self.base_url, self.reverse_geocode_path)
    }

    /// Full routing endpoint URL.
    #[must_use]
    pub fn route_url(&self) -> String {
        format!("{}{}", self.base_url, self.route_path)
    }

    /// HTTP timeout for a single OneMap call.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
