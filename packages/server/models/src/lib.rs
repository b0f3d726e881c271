#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the SpotOn server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types so the wire contract with the browser client can
//! evolve independently.

use serde::{Deserialize, Serialize};
use spot_on_carpark_models::{CandidateCarpark, Destination, LatLon};
use thiserror::Error;

/// Body of `POST /api/carparks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarparkSearchRequest {
    /// Vehicle label: `Car/Van`, `Motorcycle` or `Heavy`.
    pub vehicle_search: String,
    /// The selected OneMap search result, JSON-encoded as a string.
    pub destination_value: String,
}

/// A OneMap address search result as chosen in the browser.
///
/// OneMap returns coordinates as numeric strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneMapSearchResult {
    /// Full address.
    #[serde(rename = "ADDRESS")]
    pub address: String,
    /// WGS84 latitude.
    #[serde(rename = "LATITUDE")]
    pub latitude: String,
    /// WGS84 longitude.
    #[serde(rename = "LONGITUDE")]
    pub longitude: String,
}

/// Why a `destinationValue` could not be turned into a [`Destination`].
#[derive(Debug, Error)]
pub enum DestinationParseError {
    /// Not a JSON object with `ADDRESS`, `LATITUDE` and `LONGITUDE`.
    #[error("Malformed destination: {0}")]
    Json(#[from] serde_json::Error),

    /// The address is blank.
    #[error("Destination address is empty")]
    EmptyAddress,

    /// A coordinate is not a number.
    #[error("Destination {field} is not a number: '{value}'")]
    InvalidCoordinate {
        /// `LATITUDE` or `LONGITUDE`.
        field: &'static str,
        /// The raw value.
        value: String,
    },
}

impl OneMapSearchResult {
    /// Parses the JSON-encoded search result sent as `destinationValue`.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationParseError::Json`] if `value` is not a search
    /// result object.
    pub fn from_json(value: &str) -> Result<Self, DestinationParseError> {
        Ok(serde_json::from_str(value)?)
    }

    /// Converts into a pipeline [`Destination`].
    ///
    /// Range checking is left to the ranker; this only checks that the
    /// fields are present and numeric.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationParseError`] if the address is blank or a
    /// coordinate does not parse.
    pub fn into_destination(self) -> Result<Destination, DestinationParseError> {
        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(DestinationParseError::EmptyAddress);
        }

        let latitude = parse_coordinate("LATITUDE", &self.latitude)?;
        let longitude = parse_coordinate("LONGITUDE", &self.longitude)?;

        Ok(Destination {
            address,
            location: LatLon::new(latitude, longitude),
        })
    }
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<f64, DestinationParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| DestinationParseError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
}

/// Successful body of `POST /api/carparks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarparkSearchResponse {
    /// Ranked carparks, closest first.
    pub result: Vec<CandidateCarpark>,
}

/// Body of `GET /api/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// OneMap access token.
    pub access_token: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case() {
        let request: CarparkSearchRequest = serde_json::from_value(serde_json::json!({
            "vehicleSearch": "Car/Van",
            "destinationValue": "{}"
        }))
        .unwrap();
        assert_eq!(request.vehicle_search, "Car/Van");
        assert_eq!(request.destination_value, "{}");
    }

    #[test]
    fn parses_onemap_search_result() {
        let raw = r#"{"SEARCHVAL":"ION ORCHARD","ADDRESS":"2 ORCHARD TURN ION ORCHARD SINGAPORE 238801","LATITUDE":"1.30398379726445","LONGITUDE":"103.831977467935"}"#;
        let destination = OneMapSearchResult::from_json(raw)
            .unwrap()
            .into_destination()
            .unwrap();

        assert_eq!(
            destination.address,
            "2 ORCHARD TURN ION ORCHARD SINGAPORE 238801"
        );
        assert!((destination.location.latitude - 1.303_983_797).abs() < 1e-6);
        assert!((destination.location.longitude - 103.831_977_467).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_numeric_coordinate() {
        let raw = r#"{"ADDRESS":"ORCHARD ROAD","LATITUDE":"north","LONGITUDE":"103.83"}"#;
        let err = OneMapSearchResult::from_json(raw)
            .unwrap()
            .into_destination()
            .unwrap_err();
        assert!(matches!(
            err,
            DestinationParseError::InvalidCoordinate {
                field: "LATITUDE",
                ..
            }
        ));
    }

    #[test]
    fn rejects_blank_address() {
        let raw = r#"{"ADDRESS":"  ","LATITUDE":"1.3","LONGITUDE":"103.83"}"#;
        let err = OneMapSearchResult::from_json(raw)
            .unwrap()
            .into_destination()
            .unwrap_err();
        assert!(matches!(err, DestinationParseError::EmptyAddress));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(matches!(
            OneMapSearchResult::from_json(r#"{"ADDRESS":"ORCHARD ROAD"}"#),
            Err(DestinationParseError::Json(_))
        ));
    }
}
