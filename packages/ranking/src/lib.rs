#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Carpark ranking pipeline.
//!
//! Given a destination and a vehicle type, [`CarparkRanker::rank_carparks`]
//! returns up to [`DEFAULT_TOP_K`] carparks ordered by driving distance:
//!
//! 1. Validate the destination coordinates.
//! 2. Keep registry carparks with open lots for the vehicle type
//!    ([`spot_on_availability::filter_available`]).
//! 3. Keep carparks whose address resembles the destination address
//!    ([`spot_on_matcher`]).
//! 4. Acquire one OneMap token for the request.
//! 5. Resolve every candidate's driving distance concurrently
//!    ([`resolver`]), dropping candidates that fail.
//! 6. Stable-sort by distance and keep the closest.
//!
//! Steps 1-4 abort the request on failure. Failures in step 5 only drop
//! the affected carpark.

pub mod resolver;

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt as _};
use spot_on_availability::{AvailabilityError, AvailabilityFeed, filter_available};
use spot_on_carpark_models::{
    CandidateCarpark, Destination, InvalidVehicleTypeError, LatLon, VehicleType,
};
use spot_on_matcher::DEFAULT_SIMILARITY_THRESHOLD;
use spot_on_onemap::{AccessToken, OneMapError, RoutingService};
use spot_on_registry::{CarparkRegistry, RegistryError};
use thiserror::Error;
use tokio::sync::Semaphore;

/// Number of carparks returned by a ranking request.
pub const DEFAULT_TOP_K: usize = 4;

/// Default number of distance resolutions in flight across all requests.
pub const DEFAULT_MAX_CONCURRENT_RESOLUTIONS: usize = 8;

/// Default bound on a single carpark's distance resolution.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that abort a ranking request.
#[derive(Debug, Error)]
pub enum RankingError {
    /// The destination is missing or has unusable coordinates.
    #[error("Invalid destination: {message}")]
    InvalidDestination {
        /// What was wrong with the destination.
        message: String,
    },

    /// The vehicle label is not one of the known categories.
    #[error(transparent)]
    InvalidVehicleType(#[from] InvalidVehicleTypeError),

    /// The carpark registry could not be read.
    #[error("Carpark registry unavailable: {0}")]
    Registry(#[from] RegistryError),

    /// The live availability feed could not be fetched.
    #[error("Failed to fetch carpark availability: {0}")]
    Availability(#[from] AvailabilityError),

    /// No routing token could be acquired.
    #[error("Failed to acquire routing token: {0}")]
    Token(#[source] OneMapError),
}

impl RankingError {
    /// Whether the caller supplied bad input.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDestination { .. } | Self::InvalidVehicleType(_)
        )
    }

    /// Whether an upstream service the request depends on is unavailable.
    #[must_use]
    pub const fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::Availability(_) | Self::Token(_))
    }
}

/// Tuning for [`CarparkRanker`].
#[derive(Debug, Clone)]
pub struct RankingOptions {
    /// Minimum address similarity (0-100) for a carpark to be considered.
    pub similarity_threshold: f64,
    /// Maximum number of carparks returned.
    pub top_k: usize,
    /// Distance resolutions in flight at once, shared by all requests.
    pub max_concurrent_resolutions: usize,
    /// Bound on one carpark's distance resolution.
    pub resolve_timeout: Duration,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            max_concurrent_resolutions: DEFAULT_MAX_CONCURRENT_RESOLUTIONS,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl RankingOptions {
    /// Reads overrides from `SPOT_ON_SIMILARITY_THRESHOLD`,
    /// `SPOT_ON_MAX_CONCURRENT_RESOLUTIONS` and
    /// `SPOT_ON_RESOLVE_TIMEOUT_SECS`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// Unparseable values, a non-finite threshold, zero concurrency and a
    /// zero timeout are ignored with a warning.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            similarity_threshold: parse_var::<f64>(
                &lookup,
                "SPOT_ON_SIMILARITY_THRESHOLD",
                |t| t.is_finite(),
            )
            .unwrap_or(defaults.similarity_threshold),
            top_k: defaults.top_k,
            max_concurrent_resolutions: parse_var::<usize>(
                &lookup,
                "SPOT_ON_MAX_CONCURRENT_RESOLUTIONS",
                |n| *n > 0,
            )
            .unwrap_or(defaults.max_concurrent_resolutions),
            resolve_timeout: parse_var::<u64>(&lookup, "SPOT_ON_RESOLVE_TIMEOUT_SECS", |s| *s > 0)
                .map_or(defaults.resolve_timeout, Duration::from_secs),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    let value = lookup(key)?;
    let parsed = value.trim().parse().ok().filter(|v| accept(v));
    if parsed.is_none() {
        log::warn!("Ignoring invalid {key}={value}");
    }
    parsed
}

/// Ranks carparks for a destination.
///
/// One ranker is shared by every request; its resolution limiter bounds
/// the total number of concurrent OneMap lookups across them.
pub struct CarparkRanker {
    registry: Arc<dyn CarparkRegistry>,
    availability: Arc<dyn AvailabilityFeed>,
    routing: Arc<dyn RoutingService>,
    limiter: Arc<Semaphore>,
    options: RankingOptions,
}

impl CarparkRanker {
    /// Creates a ranker over the given collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<dyn CarparkRegistry>,
        availability: Arc<dyn AvailabilityFeed>,
        routing: Arc<dyn RoutingService>,
        options: RankingOptions,
    ) -> Self {
        let permits = options.max_concurrent_resolutions.max(1);
        Self {
            registry,
            availability,
            routing,
            limiter: Arc::new(Semaphore::new(permits)),
            options,
        }
    }

    /// The options this ranker was built with.
    #[must_use]
    pub const fn options(&self) -> &RankingOptions {
        &self.options
    }

    /// The routing service used for distance resolution.
    #[must_use]
    pub fn routing(&self) -> &dyn RoutingService {
        self.routing.as_ref()
    }

    /// Returns up to `top_k` carparks with open lots for `vehicle`, closest
    /// by driving distance first.
    ///
    /// An empty list means nothing survived filtering; it is not an error.
    ///
    /// # Errors
    ///
    /// * [`RankingError::InvalidDestination`] if the coordinates are not
    ///   valid WGS84.
    /// * [`RankingError::Registry`] if the registry cannot be read.
    /// * [`RankingError::Availability`] if the availability feed fails.
    /// * [`RankingError::Token`] if no routing token can be acquired.
    pub async fn rank_carparks(
        &self,
        destination: &Destination,
        vehicle: VehicleType,
    ) -> Result<Vec<CandidateCarpark>, RankingError> {
        if !destination.location.is_valid() {
            return Err(RankingError::InvalidDestination {
                message: format!("coordinates out of range: {}", destination.location),
            });
        }

        let registry = self.registry.fetch_all().await?;
        let snapshot = self.availability.fetch_snapshot().await?;

        let available = filter_available(&registry, &snapshot, vehicle);
        log::debug!(
            "{} of {} carparks have open {} lots",
            available.len(),
            registry.len(),
            vehicle.lot_type()
        );

        let candidates = spot_on_matcher::retain_similar(
            available,
            &destination.address,
            self.options.similarity_threshold,
            |c| c.record.address.as_str(),
        );
        log::debug!(
            "{} carparks match address '{}'",
            candidates.len(),
            destination.address
        );

        if candidates.is_empty() {
            log::info!("No candidate carparks for '{}'", destination.address);
            return Ok(Vec::new());
        }

        let token = self
            .routing
            .access_token()
            .await
            .map_err(RankingError::Token)?;

        let candidate_count = candidates.len();
        let resolved = self
            .resolve_distances(candidates, &token, destination.location)
            .await;
        log::info!(
            "Resolved {} of {candidate_count} carpark distances for '{}'",
            resolved.len(),
            destination.address
        );

        Ok(select_closest(resolved, self.options.top_k))
    }

    /// Resolves every candidate concurrently, keeping candidate order and
    /// dropping those that failed.
    async fn resolve_distances(
        &self,
        candidates: Vec<CandidateCarpark>,
        token: &AccessToken,
        start: LatLon,
    ) -> Vec<CandidateCarpark> {
        let concurrency = self.options.max_concurrent_resolutions.max(1);

        let results: Vec<(usize, Option<f64>)> =
            stream::iter(candidates.iter().enumerate().map(|(index, candidate)| {
                let carpark_id = candidate.record.carpark_id.as_str();
                let point = candidate.record.location();
                async move {
                    let distance = resolver::resolve_bounded(
                        self.routing.as_ref(),
                        &self.limiter,
                        self.options.resolve_timeout,
                        token,
                        carpark_id,
                        point,
                        start,
                    )
                    .await;
                    (index, distance)
                }
            }))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut distances = vec![None; candidates.len()];
        for (index, distance) in results {
            distances[index] = distance;
        }

        candidates
            .into_iter()
            .zip(distances)
            .filter_map(|(mut candidate, distance)| {
                candidate.distance = Some(distance?);
                Some(candidate)
            })
            .collect()
    }
}

/// Stable-sorts resolved carparks by ascending distance and keeps the
/// first `top_k`. Carparks at equal distance keep their relative order.
#[must_use]
pub fn select_closest(mut resolved: Vec<CandidateCarpark>, top_k: usize) -> Vec<CandidateCarpark> {
    resolved.retain(|c| c.distance.is_some());
    resolved.sort_by(|a, b| {
        let a = a.distance.unwrap_or(f64::INFINITY);
        let b = b.distance.unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
    resolved.truncate(top_k);
    resolved
}
