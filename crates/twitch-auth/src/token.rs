//! Client-credentials token exchange
//!
//! One POST to the identity endpoint with the app's client id and secret.
//! The response carries a bearer token and its lifetime in seconds; turning
//! that lifetime into an absolute expiry is the cache's job.

use std::time::Duration;

use serde::Deserialize;

use crate::constants::GRANT_TYPE;
use crate::error::{Error, Result};

/// Response from the token endpoint.
///
/// `expires_in` is a delta in seconds from the response time.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Exchange the app's client credentials for an app access token.
///
/// Non-2xx responses become `Error::Rejected` with the status and body the
/// identity provider sent. A 2xx body that doesn't parse is
/// `Error::InvalidResponse`.
pub async fn exchange_client_credentials(
    client: &reqwest::Client,
    endpoint: &str,
    client_id: &str,
    client_secret: &str,
    timeout: Duration,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint)
        .timeout(timeout)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", GRANT_TYPE),
        ])
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(timeout)
            } else {
                Error::Http(format!("token exchange request failed: {e}"))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(e.to_string()))
}
