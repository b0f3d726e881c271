//! Per-carpark driving distance resolution.
//!
//! Each resolution makes exactly two calls: a reverse geocode of the
//! carpark's SVY21 point, then a driving route from the destination to the
//! geocoded point. Any failure (error, empty geocode, timeout) yields
//! `None` and the carpark is dropped from the ranking; it never fails the
//! request.

use std::time::Duration;

use spot_on_carpark_models::{LatLon, PlanarPoint};
use spot_on_onemap::{AccessToken, RoutingService};
use tokio::sync::Semaphore;

/// Resolves the driving distance in metres from `destination` to the
/// carpark at `point`, or `None` if either call fails.
pub async fn resolve_distance(
    routing: &dyn RoutingService,
    token: &AccessToken,
    carpark_id: &str,
    point: PlanarPoint,
    destination: LatLon,
) -> Option<f64> {
    let end = match routing.reverse_geocode(token, point).await {
        Ok(Some(end)) => end,
        Ok(None) => {
            log::warn!("Carpark {carpark_id}: no reverse geocode result near {point:?}");
            return None;
        }
        Err(e) => {
            log::warn!("Carpark {carpark_id}: reverse geocode failed: {e}");
            return None;
        }
    };

    match routing.route_distance(token, destination, end).await {
        Ok(distance) => {
            log::debug!("Carpark {carpark_id}: {distance:.0} m");
            Some(distance)
        }
        Err(e) => {
            log::warn!("Carpark {carpark_id}: route lookup failed: {e}");
            None
        }
    }
}

/// [`resolve_distance`] under a shared concurrency limit and a timeout.
///
/// The timeout starts once a permit has been acquired, so time spent
/// queueing behind other resolutions does not count against it.
pub async fn resolve_bounded(
    routing: &dyn RoutingService,
    limiter: &Semaphore,
    timeout: Duration,
    token: &AccessToken,
    carpark_id: &str,
    point: PlanarPoint,
    destination: LatLon,
) -> Option<f64> {
    let Ok(_permit) = limiter.acquire().await else {
        log::warn!("Carpark {carpark_id}: resolution limiter closed");
        return None;
    };

    if let Ok(distance) = tokio::time::timeout(
        timeout,
        resolve_distance(routing, token, carpark_id, point, destination),
    )
    .await
    {
        distance
    } else {
        log::warn!("Carpark {carpark_id}: distance resolution timed out after {timeout:?}");
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use spot_on_onemap::OneMapError;

    use super::*;

    enum Geocode {
        Found,
        Empty,
        Fails,
    }

    struct StubRouting {
        geocode: Geocode,
        route: Option<f64>,
        delay: Duration,
        route_calls: AtomicUsize,
    }

    impl StubRouting {
        fn new(geocode: Geocode, route: Option<f64>) -> Self {
            Self {
                geocode,
                route,
                delay: Duration::ZERO,
                route_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RoutingService for StubRouting {
        async fn access_token(&self) -> Result<AccessToken, OneMapError> {
            Ok(AccessToken::new("token"))
        }

        async fn reverse_geocode(
            &self,
            _token: &AccessToken,
            _point: PlanarPoint,
        ) -> Result<Option<LatLon>, OneMapError> {
            tokio::time::sleep(self.delay).await;
            match self.geocode {
                Geocode::Found => Ok(Some(LatLon::new(1.3, 103.85))),
                Geocode::Empty => Ok(None),
                Geocode::Fails => Err(OneMapError::Status { status: 502 }),
            }
        }

        async fn route_distance(
            &self,
            _token: &AccessToken,
            _start: LatLon,
            _end: LatLon,
        ) -> Result<f64, OneMapError> {
            self.route_calls.fetch_add(1, Ordering::SeqCst);
            self.route.ok_or(OneMapError::RateLimited)
        }
    }

    const POINT: PlanarPoint = PlanarPoint {
        x: 30_314.79,
        y: 31_490.49,
    };
    const DESTINATION: LatLon = LatLon::new(1.3048, 103.8318);

    async fn resolve(routing: &StubRouting) -> Option<f64> {
        resolve_distance(routing, &AccessToken::new("token"), "ACB", POINT, DESTINATION).await
    }

    #[tokio::test]
    async fn resolves_distance() {
        let routing = StubRouting::new(Geocode::Found, Some(1250.0));
        assert_eq!(resolve(&routing).await, Some(1250.0));
        assert_eq!(routing.route_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn geocode_failure_skips_route_call() {
        for geocode in [Geocode::Empty, Geocode::Fails] {
            let routing = StubRouting::new(geocode, Some(1250.0));
            assert_eq!(resolve(&routing).await, None);
            assert_eq!(routing.route_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn route_failure_is_none() {
        let routing = StubRouting::new(Geocode::Found, None);
        assert_eq!(resolve(&routing).await, None);
    }

    #[tokio::test]
    async fn slow_resolution_times_out() {
        let mut routing = StubRouting::new(Geocode::Found, Some(10.0));
        routing.delay = Duration::from_millis(500);
        let limiter = Semaphore::new(1);

        let result = resolve_bounded(
            &routing,
            &limiter,
            Duration::from_millis(20),
            &AccessToken::new("token"),
            "ACB",
            POINT,
            DESTINATION,
        )
        .await;

        assert_eq!(result, None);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn closed_limiter_is_none() {
        let routing = StubRouting::new(Geocode::Found, Some(10.0));
        let limiter = Semaphore::new(1);
        limiter.close();

        let result = resolve_bounded(
            &routing,
            &limiter,
            Duration::from_secs(1),
            &AccessToken::new("token"),
            "ACB",
            POINT,
            DESTINATION,
        )
        .await;

        assert_eq!(result, None);
        assert_eq!(routing.route_calls.load(Ordering::SeqCst), 0);
    }
}
