//! OneMap driving routes.
//!
//! `GET /api/public/routingsvc/route?start=lat,lon&end=lat,lon&routeType=drive`
//! returns a route whose `route_summary.total_distance` is the road
//! distance in metres.

use spot_on_carpark_models::LatLon;

use crate::{AccessToken, OneMapError, as_number, check_status};

/// Fetches the total route distance from `start` to `end` in metres.
///
/// # Errors
///
/// Returns [`OneMapError`] if the HTTP request or response parsing fails.
pub async fn total_distance(
    client: &reqwest::Client,
    url: &str,
    token: &AccessToken,
    start: LatLon,
    end: LatLon,
    route_type: &str,
) -> Result<f64, OneMapError> {
    let start = start.to_string();
    let end = end.to_string();

    let resp = client
        .get(url)
        .bearer_auth(token.as_str())
        .query(&[
            ("start", start.as_str()),
            ("end", end.as_str()),
            ("routeType", route_type),
        ])
        .send()
        .await?;

    check_status(&resp)?;

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Extracts `route_summary.total_distance`.
fn parse_response(body: &serde_json::Value) -> Result<f64, OneMapError> {
    let distance = body
        .pointer("/route_summary/total_distance")
        .and_then(as_number)
        .ok_or_else(|| OneMapError::Parse {
            message: "route response missing route_summary.total_distance".to_string(),
        })?;

    if !distance.is_finite() || distance < 0.0 {
        return Err(OneMapError::Parse {
            message: format!("invalid route distance {distance}"),
        });
    }

    Ok(distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_total_distance() {
        let body = serde_json::json!({
            "status_message": "Found route between points",
            "route_summary": {
                "start_point": "ORCHARD ROAD",
                "end_point": "QUEEN STREET",
                "total_time": 412,
                "total_distance": 2873
            },
            "status": 0
        });
        assert!((parse_response(&body).unwrap() - 2873.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_summary_is_error() {
        let body = serde_json::json!({
            "status_message": "Error: start or end point not reachable",
            "status": 207
        });
        assert!(matches!(
            parse_response(&body),
            Err(OneMapError::Parse { .. })
        ));
    }

    #[test]
    fn negative_distance_is_error() {
        let body = serde_json::json!({"route_summary": {"total_distance": -1}});
        assert!(parse_response(&body).is_err());
    }
}
