#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live carpark lot availability.
//!
//! Fetches the data.gov.sg carpark-availability feed and intersects it
//! with the carpark registry. The feed is read fresh on every ranking
//! request; any failure to reach it fails the request rather than
//! falling back to older data.
//!
//! See <https://data.gov.sg/datasets/d_ca933a644e55d34fe21f28b8052fac63/view>

pub mod filter;

use async_trait::async_trait;
use spot_on_carpark_models::AvailabilitySnapshot;
use thiserror::Error;

pub use filter::filter_available;

/// Default data.gov.sg carpark-availability endpoint.
pub const DEFAULT_AVAILABILITY_URL: &str =
    "https://api.data.gov.sg/v1/transport/carpark-availability";

/// Errors from fetching the availability feed.
#[derive(Debug, Error)]
pub enum AvailabilityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("Availability feed returned status {status}")]
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
}

/// Source of live availability snapshots.
#[async_trait]
pub trait AvailabilityFeed: Send + Sync {
    /// Fetches the current availability of every carpark.
    ///
    /// # Errors
    ///
    /// Returns [`AvailabilityError`] if the feed cannot be reached, answers
    /// with a non-success status, or returns a malformed body.
    async fn fetch_snapshot(&self) -> Result<AvailabilitySnapshot, AvailabilityError>;
}

/// [`AvailabilityFeed`] backed by the data.gov.sg HTTP API.
#[derive(Debug, Clone)]
pub struct HttpAvailabilityFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpAvailabilityFeed {
    /// Creates a feed client for `url`.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Creates a feed client for `SPOT_ON_AVAILABILITY_URL`, or
    /// [`DEFAULT_AVAILABILITY_URL`] when unset.
    #[must_use]
    pub fn from_env(client: reqwest::Client) -> Self {
        let url = std::env::var("SPOT_ON_AVAILABILITY_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_AVAILABILITY_URL.to_string());
        Self::new(client, url)
    }
}

#[async_trait]
impl AvailabilityFeed for HttpAvailabilityFeed {
    async fn fetch_snapshot(&self) -> Result<AvailabilitySnapshot, AvailabilityError> {
        log::debug!("Fetching carpark availability from {}", self.url);

        let resp = self.client.get(&self.url).send().await?;

        if !resp.status().is_success() {
            return Err(AvailabilityError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses the feed body, reading only the first item.
///
/// # Errors
///
/// Returns [`AvailabilityError::Parse`] if `items[0]` is missing or does
/// not have the expected shape.
pub fn parse_response(body: &serde_json::Value) -> Result<AvailabilitySnapshot, AvailabilityError> {
    let first = body
        .get("items")
        .and_then(serde_json::Value::as_array)
        .and_then(|items| items.first())
        .ok_or_else(|| AvailabilityError::Parse {
            message: "availability response missing 'items[0]'".to_string(),
        })?;

    serde_json::from_value(first.clone()).map_err(|e| AvailabilityError::Parse {
        message: format!("malformed availability item: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    use super::*;

    /// Serves one canned HTTP response on a local port and returns its URL.
    async fn serve_once(status_line: &str, body: &str) -> String {
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/carpark-availability")
    }

    #[tokio::test]
    async fn server_error_fails_closed() {
        let url = serve_once("500 Internal Server Error", "").await;
        let feed = HttpAvailabilityFeed::new(reqwest::Client::new(), url);

        assert!(matches!(
            feed.fetch_snapshot().await,
            Err(AvailabilityError::Status { status: 500 })
        ));
    }

    #[tokio::test]
    async fn fetches_snapshot_over_http() {
        let body = serde_json::json!({
            "items": [{
                "timestamp": "2024-03-01T10:15:27+08:00",
                "carpark_data": [{
                    "carpark_info": [
                        {"total_lots": "105", "lot_type": "C", "lots_available": "12"}
                    ],
                    "carpark_number": "HE12",
                    "update_datetime": "2024-03-01T10:14:42"
                }]
            }]
        })
        .to_string();
        let url = serve_once("200 OK", &body).await;
        let feed = HttpAvailabilityFeed::new(reqwest::Client::new(), url);

        let snapshot = feed.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.carparks.len(), 1);
        assert_eq!(snapshot.carparks[0].lots[0].available(), Some(12));
    }

    #[test]
    fn parses_feed_response() {
        let body = serde_json::json!({
            "items": [{
                "timestamp": "2024-03-01T10:15:27+08:00",
                "carpark_data": [
                    {
                        "carpark_info": [
                            {"total_lots": "105", "lot_type": "C", "lots_available": "12"},
                            {"total_lots": "20", "lot_type": "M", "lots_available": "0"}
                        ],
                        "carpark_number": "HE12",
                        "update_datetime": "2024-03-01T10:14:42"
                    },
                    {
                        "carpark_info": [
                            {"total_lots": "583", "lot_type": "C", "lots_available": "314"}
                        ],
                        "carpark_number": "HLM",
                        "update_datetime": "2024-03-01T10:14:39"
                    }
                ]
            }]
        });

        let snapshot = parse_response(&body).unwrap();
        assert_eq!(
            snapshot.timestamp.as_deref(),
            Some("2024-03-01T10:15:27+08:00")
        );
        assert_eq!(snapshot.carparks.len(), 2);
        assert_eq!(snapshot.carparks[0].lots.len(), 2);
        assert_eq!(snapshot.carparks[1].carpark_number, "HLM");
    }

    #[test]
    fn missing_items_is_parse_error() {
        let body = serde_json::json!({"items": []});
        assert!(matches!(
            parse_response(&body),
            Err(AvailabilityError::Parse { .. })
        ));

        let body = serde_json::json!({"message": "Internal Server Error"});
        assert!(matches!(
            parse_response(&body),
            Err(AvailabilityError::Parse { .. })
        ));
    }

    #[test]
    fn malformed_carpark_data_is_parse_error() {
        let body = serde_json::json!({
            "items": [{"carpark_data": [{"carpark_info": []}]}]
        });
        assert!(matches!(
            parse_response(&body),
            Err(AvailabilityError::Parse { .. })
        ));
    }
}
