//! OneMap SVY21 reverse geocoding.
//!
//! `GET /api/public/revgeocodexy?location=X,Y&buffer=N&addressType=All&otherFeatures=N`
//! returns `{"GeocodeInfo": [{"LATITUDE": "1.3", "LONGITUDE": "103.8", ...}]}`
//! ordered by proximity. Only the first entry is used.

use spot_on_carpark_models::{LatLon, PlanarPoint};

use crate::{AccessToken, OneMapError, as_number, check_status};

/// Reverse-geocodes an SVY21 point within `buffer_m` metres.
///
/// # Errors
///
/// Returns [`OneMapError`] if the HTTP request or response parsing fails.
pub async fn reverse_geocode_xy(
    client: &reqwest::Client,
    url: &str,
    token: &AccessToken,
    point: PlanarPoint,
    buffer_m: u32,
) -> Result<Option<LatLon>, OneMapError> {
    let location = format!("{},{}", point.x, point.y);
    let buffer = buffer_m.to_string();

    let resp = client
        .get(url)
        .bearer_auth(token.as_str())
        .query(&[
            ("location", location.as_str()),
            ("buffer", buffer.as_str()),
            ("addressType", "All"),
            ("otherFeatures", "N"),
        ])
        .send()
        .await?;

    check_status(&resp)?;

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a `revgeocodexy` response.
fn parse_response(body: &serde_json::Value) -> Result<Option<LatLon>, OneMapError> {
    let results = body
        .get("GeocodeInfo")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| OneMapError::Parse {
            message: "reverse geocode response missing 'GeocodeInfo' array".to_string(),
        })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let latitude = first
        .get("LATITUDE")
        .and_then(as_number)
        .ok_or_else(|| OneMapError::Parse {
            message: "GeocodeInfo entry missing LATITUDE".to_string(),
        })?;
    let longitude = first
        .get("LONGITUDE")
        .and_then(as_number)
        .ok_or_else(|| OneMapError::Parse {
            message: "GeocodeInfo entry missing LONGITUDE".to_string(),
        })?;

    Ok(Some(LatLon::new(latitude, longitude)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_result() {
        let body = serde_json::json!({
            "GeocodeInfo": [
                {
                    "BUILDINGNAME": "HDB-ALBERT CENTRE",
                    "BLOCK": "270",
                    "ROAD": "QUEEN STREET",
                    "POSTALCODE": "180270",
                    "XCOORD": "30314.7936",
                    "YCOORD": "31490.4942",
                    "LATITUDE": "1.30248",
                    "LONGITUDE": "103.85441"
                },
                {
                    "LATITUDE": "1.40000",
                    "LONGITUDE": "103.90000"
                }
            ]
        });
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 1.302_48).abs() < 1e-9);
        assert!((result.longitude - 103.854_41).abs() < 1e-9);
    }

    #[test]
    fn empty_result_is_none() {
        let body = serde_json::json!({"GeocodeInfo": []});
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn malformed_result_is_error() {
        let body = serde_json::json!({"error": "Unauthorized"});
        assert!(matches!(
            parse_response(&body),
            Err(OneMapError::Parse { .. })
        ));

        let body = serde_json::json!({"GeocodeInfo": [{"LATITUDE": "1.3"}]});
        assert!(matches!(
            parse_response(&body),
            Err(OneMapError::Parse { .. })
        ));
    }
}
