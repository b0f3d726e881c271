//! HDB carpark information sync.
//!
//! Downloads the "HDB Carpark Information" dataset from the data.gov.sg
//! datastore API and converts it into [`CarparkRecord`]s. Every field in
//! the dataset is a string; coordinates are SVY21.
//!
//! See <https://data.gov.sg/datasets/d_23f946fa557947f93a8043bbef41dd09/view>

use std::path::Path;

use spot_on_carpark_models::CarparkRecord;

use crate::{RegistryError, retry, write_json};

/// data.gov.sg datastore search endpoint.
pub const DATASTORE_URL: &str = "https://data.gov.sg/api/action/datastore_search";

/// Resource id of the HDB carpark information dataset.
pub const HDB_CARPARK_RESOURCE_ID: &str = "d_23f946fa557947f93a8043bbef41dd09";

/// Records requested per page.
const PAGE_SIZE: usize = 5000;

/// Fetches every HDB carpark record, following pagination.
///
/// # Errors
///
/// Returns [`RegistryError`] if a page cannot be fetched or has an
/// unexpected shape.
pub async fn fetch_records(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<CarparkRecord>, RegistryError> {
    let mut records = Vec::new();
    let mut offset = 0;
    let limit = PAGE_SIZE.to_string();

    loop {
        let offset_param = offset.to_string();
        let body = retry::send_json(|| {
            client.get(url).query(&[
                ("resource_id", HDB_CARPARK_RESOURCE_ID),
                ("limit", limit.as_str()),
                ("offset", offset_param.as_str()),
            ])
        })
        .await?;

        let page = parse_page(&body)?;
        let fetched = page.rows;
        records.extend(page.records);
        offset += fetched;

        log::info!(
            "Fetched {offset}{} HDB carpark rows",
            page.total.map_or_else(String::new, |t| format!("/{t}"))
        );

        if fetched < PAGE_SIZE || page.total.is_some_and(|t| offset >= t) {
            break;
        }
    }

    Ok(records)
}

/// Downloads the dataset and writes it as a registry snapshot at `path`.
///
/// Returns the number of carparks written.
///
/// # Errors
///
/// Returns [`RegistryError`] if the download or the write fails.
pub async fn sync_snapshot(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<usize, RegistryError> {
    let records = fetch_records(client, url).await?;
    write_json(path, &records).await?;
    log::info!("Wrote {} carparks to {}", records.len(), path.display());
    Ok(records.len())
}

/// One page of the datastore response.
struct Page {
    /// Carparks that converted cleanly.
    records: Vec<CarparkRecord>,
    /// Raw rows on the page, including ones that were skipped.
    rows: usize,
    /// Total rows in the dataset, when reported.
    total: Option<usize>,
}

fn parse_page(body: &serde_json::Value) -> Result<Page, RegistryError> {
    if body.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        return Err(RegistryError::Parse {
            message: "datastore_search reported success=false".to_string(),
        });
    }

    let rows = body
        .pointer("/result/records")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| RegistryError::Parse {
            message: "datastore response missing 'result.records' array".to_string(),
        })?;

    let total = body
        .pointer("/result/total")
        .and_then(serde_json::Value::as_u64)
        .and_then(|t| usize::try_from(t).ok());

    let records = rows.iter().filter_map(parse_record).collect();

    Ok(Page {
        records,
        rows: rows.len(),
        total,
    })
}

/// Converts one dataset row. Rows without an id, address or valid
/// coordinates are skipped.
fn parse_record(row: &serde_json::Value) -> Option<CarparkRecord> {
    let text = |key: &str| {
        row.get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    let number = |key: &str| text(key).parse::<f64>().ok();

    let carpark_id = text("car_park_no");
    let address = text("address");
    let (Some(x_coord), Some(y_coord)) = (number("x_coord"), number("y_coord")) else {
        log::warn!("Skipping carpark '{carpark_id}': missing coordinates");
        return None;
    };
    if carpark_id.is_empty() || address.is_empty() {
        log::warn!("Skipping carpark row without id or address: {row}");
        return None;
    }

    Some(CarparkRecord {
        carpark_id,
        address,
        x_coord,
        y_coord,
        carpark_type: text("car_park_type"),
        parking_system: text("type_of_parking_system"),
        short_term_parking: text("short_term_parking"),
        free_parking: text("free_parking"),
        night_parking: text("night_parking").eq_ignore_ascii_case("YES"),
        carpark_decks: text("car_park_decks").parse().unwrap_or(0),
        gantry_height: number("gantry_height").unwrap_or(0.0),
        carpark_basement: text("car_park_basement").eq_ignore_ascii_case("Y"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> serde_json::Value {
        serde_json::json!({
            "_id": 1,
            "car_park_no": "ACB",
            "address": "BLK 270/271 ALBERT CENTRE BASEMENT CAR PARK",
            "x_coord": "30314.7936",
            "y_coord": "31490.4942",
            "car_park_type": "BASEMENT CAR PARK",
            "type_of_parking_system": "ELECTRONIC PARKING",
            "short_term_parking": "WHOLE DAY",
            "free_parking": "NO",
            "night_parking": "YES",
            "car_park_decks": "1",
            "gantry_height": "1.80",
            "car_park_basement": "Y"
        })
    }

    #[test]
    fn parses_hdb_row() {
        let record = parse_record(&row()).unwrap();
        assert_eq!(record.carpark_id, "ACB");
        assert!((record.x_coord - 30_314.7936).abs() < 1e-6);
        assert!((record.y_coord - 31_490.4942).abs() < 1e-6);
        assert_eq!(record.carpark_type, "BASEMENT CAR PARK");
        assert_eq!(record.parking_system, "ELECTRONIC PARKING");
        assert!(record.night_parking);
        assert_eq!(record.carpark_decks, 1);
        assert!((record.gantry_height - 1.8).abs() < 1e-9);
        assert!(record.carpark_basement);
    }

    #[test]
    fn flags_default_to_false() {
        let mut value = row();
        value["night_parking"] = serde_json::json!("NO");
        value["car_park_basement"] = serde_json::json!("N");
        value["car_park_decks"] = serde_json::json!("");
        let record = parse_record(&value).unwrap();
        assert!(!record.night_parking);
        assert!(!record.carpark_basement);
        assert_eq!(record.carpark_decks, 0);
    }

    #[test]
    fn skips_rows_without_coordinates() {
        let mut value = row();
        value["x_coord"] = serde_json::json!("");
        assert!(parse_record(&value).is_none());
    }

    #[test]
    fn parses_page_with_total() {
        let mut bad = row();
        bad["car_park_no"] = serde_json::json!("");
        let body = serde_json::json!({
            "success": true,
            "result": {
                "records": [row(), bad],
                "total": 2
            }
        });
        let page = parse_page(&body).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.rows, 2);
        assert_eq!(page.total, Some(2));
    }

    #[test]
    fn unsuccessful_page_is_error() {
        let body = serde_json::json!({"success": false, "error": {"message": "not found"}});
        assert!(matches!(parse_page(&body), Err(RegistryError::Parse { .. })));
    }
}
