//! OneMap token endpoint.
//!
//! `POST /api/auth/post/getToken` with `{"email", "password"}` returns
//! `{"access_token": "...", "expiry_timestamp": "..."}`. Tokens are valid
//! for several days but are requested once per ranking request so that no
//! token state is shared across requests.

use crate::{AccessToken, OneMapCredentials, OneMapError, check_status};

/// Exchanges credentials for a bearer token.
///
/// # Errors
///
/// Returns [`OneMapError`] if the HTTP request fails, OneMap rejects the
/// credentials, or the response has no `access_token`.
pub async fn request_token(
    client: &reqwest::Client,
    url: &str,
    credentials: &OneMapCredentials,
) -> Result<AccessToken, OneMapError> {
    let resp = client
        .post(url)
        .json(&serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        }))
        .send()
        .await?;

    check_status(&resp)?;

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses the token endpoint response.
fn parse_response(body: &serde_json::Value) -> Result<AccessToken, OneMapError> {
    body.get("access_token")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .map(AccessToken::new)
        .ok_or_else(|| OneMapError::Parse {
            message: "token response missing 'access_token'".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token() {
        let body = serde_json::json!({
            "access_token": "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9.payload.sig",
            "expiry_timestamp": "1712345678"
        });
        let token = parse_response(&body).unwrap();
        assert!(token.as_str().starts_with("eyJ0eXAi"));
    }

    #[test]
    fn missing_or_empty_token_is_error() {
        let body = serde_json::json!({"error": "Invalid credentials"});
        assert!(matches!(
            parse_response(&body),
            Err(OneMapError::Parse { .. })
        ));

        let body = serde_json::json!({"access_token": ""});
        assert!(matches!(
            parse_response(&body),
            Err(OneMapError::Parse { .. })
        ));
    }
}
