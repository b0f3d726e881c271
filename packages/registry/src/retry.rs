//! HTTP retry with exponential backoff for the registry sync.
//!
//! The sync is an offline batch job against a public dataset that
//! occasionally answers with 429 or 5xx. Requests are rebuilt through a
//! closure on every attempt since a [`reqwest::RequestBuilder`] is
//! consumed by `send()`.

use std::time::Duration;

use crate::RegistryError;

/// Maximum number of retry attempts for transient failures.
///
/// With backoff of 1s, 2s, 4s, 8s the sync gives up after 15 seconds of
/// waiting.
const MAX_RETRIES: u32 = 4;

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// Retries connection errors, timeouts, HTTP 429 and HTTP 5xx. Other 4xx
/// responses are permanent and returned immediately.
///
/// # Errors
///
/// Returns [`RegistryError`] if every attempt fails, the status is a
/// permanent client error, or the body is not valid JSON.
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, RegistryError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(&build_request).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn send_inner<F>(build_request: &F) -> Result<reqwest::Response, RegistryError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << (attempt - 1));
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(RegistryError::Http(e)),
            Ok(response) => {
                let status = response.status();
                match classify(status) {
                    Outcome::Success => return Ok(response),
                    Outcome::Retry if attempt < MAX_RETRIES => {
                        log::warn!("  HTTP {status}");
                    }
                    Outcome::Retry => {
                        return Err(RegistryError::Parse {
                            message: format!("HTTP {status} after {MAX_RETRIES} retries"),
                        });
                    }
                    Outcome::Permanent => {
                        return Err(RegistryError::Parse {
                            message: format!("HTTP {status}"),
                        });
                    }
                }
            }
        }

        attempt += 1;
    }
}

/// What to do with a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Retry,
    Permanent,
}

/// 429 and 5xx are worth retrying; any other non-success is final.
fn classify(status: reqwest::StatusCode) -> Outcome {
    if status.is_success() {
        Outcome::Success
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Outcome::Retry
    } else {
        Outcome::Permanent
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
