#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Carpark, availability and destination types.
//!
//! These are the shared types flowing through the ranking pipeline: the
//! static [`CarparkRecord`] registry entries, the per-request
//! [`AvailabilitySnapshot`] from the live lot feed, the [`Destination`]
//! supplied by the caller and the [`CandidateCarpark`] produced while
//! narrowing the registry down to a ranked result.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Vehicle category a user is looking to park.
///
/// Parsed from the labels shown in the search form and mapped onto the
/// single-character lot-type codes used by the availability feed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum VehicleType {
    /// Cars and vans (lot type `C`).
    #[serde(rename = "Car/Van")]
    #[strum(serialize = "Car/Van")]
    CarVan,
    /// Motorcycles (lot type `M`).
    #[serde(rename = "Motorcycle")]
    #[strum(serialize = "Motorcycle")]
    Motorcycle,
    /// Heavy vehicles (lot type `H`).
    #[serde(rename = "Heavy")]
    #[strum(serialize = "Heavy")]
    Heavy,
}

impl VehicleType {
    /// Parses a search-form label (`"Car/Van"`, `"Motorcycle"`, `"Heavy"`).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidVehicleTypeError`] for any other label. Unknown
    /// labels are never passed through to the availability lookup.
    pub fn from_label(label: &str) -> Result<Self, InvalidVehicleTypeError> {
        label.trim().parse().map_err(|_| InvalidVehicleTypeError {
            label: label.to_string(),
        })
    }

    /// Lot-type code used by the availability feed.
    #[must_use]
    pub const fn lot_type(self) -> &'static str {
        match self {
            Self::CarVan => "C",
            Self::Motorcycle => "M",
            Self::Heavy => "H",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::CarVan, Self::Motorcycle, Self::Heavy]
    }
}

/// Error returned when a vehicle label matches none of the known categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVehicleTypeError {
    /// The label that was provided.
    pub label: String,
}

impl std::fmt::Display for InvalidVehicleTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unrecognized vehicle type '{}': expected Car/Van, Motorcycle or Heavy",
            self.label
        )
    }
}

impl std::error::Error for InvalidVehicleTypeError {}

/// A point in the SVY21 projected coordinate system (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LatLon {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Formats as `"lat,lon"`, the form routing services take in query strings.
impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A carpark as held by the registry.
///
/// Field names on the wire follow the registry snapshot format
/// (`X_coord`/`Y_coord` in particular).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarparkRecord {
    /// Carpark number (e.g. `"ACB"`).
    pub carpark_id: String,
    /// Registered street address.
    pub address: String,
    /// SVY21 easting.
    #[serde(rename = "X_coord")]
    pub x_coord: f64,
    /// SVY21 northing.
    #[serde(rename = "Y_coord")]
    pub y_coord: f64,
    /// Carpark type (e.g. `"MULTI-STOREY CAR PARK"`).
    #[serde(default)]
    pub carpark_type: String,
    /// Parking system (e.g. `"ELECTRONIC PARKING"`).
    #[serde(default)]
    pub parking_system: String,
    /// Short-term parking availability description.
    #[serde(default)]
    pub short_term_parking: String,
    /// Free parking description (e.g. `"SUN & PH FR 7AM-10.30PM"`).
    #[serde(default)]
    pub free_parking: String,
    /// Whether night parking is offered. `1`/`0` on the wire.
    #[serde(default, with = "int_flag")]
    pub night_parking: bool,
    /// Number of decks.
    #[serde(default)]
    pub carpark_decks: u32,
    /// Gantry height in metres.
    #[serde(default)]
    pub gantry_height: f64,
    /// Whether the carpark has a basement. `1`/`0` on the wire.
    #[serde(default, with = "int_flag")]
    pub carpark_basement: bool,
}

/// Booleans carried as `1`/`0`, the form the browser client compares
/// against. Plain JSON booleans are accepted on input.
mod int_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(value) => value,
            Flag::Int(value) => value != 0,
        })
    }
}

impl CarparkRecord {
    /// The carpark's planar location.
    #[must_use]
    pub const fn location(&self) -> PlanarPoint {
        PlanarPoint {
            x: self.x_coord,
            y: self.y_coord,
        }
    }
}

/// Live availability for one lot type within a carpark.
///
/// Counts are transported as strings by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotAvailability {
    /// Lot-type code (`C`, `M`, `H`, ...).
    pub lot_type: String,
    /// Total lots of this type.
    #[serde(default)]
    pub total_lots: String,
    /// Currently open lots of this type.
    pub lots_available: String,
}

impl LotAvailability {
    /// Parses [`Self::lots_available`] as an integer.
    #[must_use]
    pub fn available(&self) -> Option<i64> {
        self.lots_available.trim().parse().ok()
    }
}

/// Live availability for a single carpark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarparkAvailability {
    /// Carpark number, matching [`CarparkRecord::carpark_id`].
    pub carpark_number: String,
    /// When the feed last updated this carpark.
    #[serde(default)]
    pub update_datetime: Option<String>,
    /// One entry per lot type.
    #[serde(rename = "carpark_info", default)]
    pub lots: Vec<LotAvailability>,
}

/// A point-in-time view of the availability feed.
///
/// Fetched fresh for every ranking request and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    /// Feed timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Per-carpark availability, in feed order.
    #[serde(rename = "carpark_data", default)]
    pub carparks: Vec<CarparkAvailability>,
}

/// A registry carpark that survived availability filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCarpark {
    /// The registry entry.
    #[serde(flatten)]
    pub record: CarparkRecord,
    /// Open lots for the requested vehicle type.
    pub lots_available: u32,
    /// Driving distance from the destination in metres, once resolved.
    #[serde(skip)]
    pub distance: Option<f64>,
}

impl CandidateCarpark {
    /// Wraps a registry record with its open lot count.
    #[must_use]
    pub const fn new(record: CarparkRecord, lots_available: u32) -> Self {
        Self {
            record,
            lots_available,
            distance: None,
        }
    }
}

/// Where the user wants to go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Free-form address, as chosen from address search.
    pub address: String,
    /// Destination coordinates.
    pub location: LatLon,
}
