//! App access token cache
//!
//! Holds a single credential and its expiry. `token()` returns the cached
//! value while it is valid and performs a client-credentials exchange when it
//! is missing or expired. The credential sits behind a tokio Mutex that is
//! held for the whole refresh, so concurrent callers hitting an expired
//! cache wait for one exchange and reuse its result instead of each issuing
//! their own.

use std::time::{Duration, Instant};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::SAFETY_MARGIN_SECS;
use crate::error::{Error, Result};
use crate::token::exchange_client_credentials;

/// A token plus the instant after which it must not be handed out.
struct CachedToken {
    token: Secret<String>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Single-credential cache for the app access token.
pub struct TokenCache {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: Secret<String>,
    timeout: Duration,
    credential: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Create an empty cache. The first `token()` call performs an exchange.
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            client_id: client_id.into(),
            client_secret,
            timeout,
            credential: Mutex::new(None),
        }
    }

    /// Client id the token was issued to. Helix wants it on every call.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Return a valid app access token, exchanging credentials if needed.
    ///
    /// On failure the previous credential (if any) is left in place; it is
    /// already expired, so the next call tries again.
    pub async fn token(&self) -> Result<String> {
        let mut slot = self.credential.lock().await;

        if let Some(cached) = slot.as_ref().filter(|c| c.is_valid_at(Instant::now())) {
            return Ok(cached.token.expose().clone());
        }

        debug!(endpoint = %self.endpoint, "app access token missing or expired, exchanging");

        let response = match exchange_client_credentials(
            &self.client,
            &self.endpoint,
            &self.client_id,
            self.client_secret.expose(),
            self.timeout,
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("twitch_token_refreshes_total", "outcome" => "failure")
                    .increment(1);
                warn!(error = %e, "app access token exchange failed");
                return Err(e);
            }
        };

        let lifetime = Duration::from_secs(response.expires_in)
            .saturating_sub(Duration::from_secs(SAFETY_MARGIN_SECS));
        let Some(expires_at) = Instant::now().checked_add(lifetime) else {
            metrics::counter!("twitch_token_refreshes_total", "outcome" => "failure").increment(1);
            warn!(expires_in = response.expires_in, "token lifetime out of range");
            return Err(Error::InvalidResponse(format!(
                "expires_in {} is out of range",
                response.expires_in
            )));
        };
        let token = response.access_token;

        *slot = Some(CachedToken {
            token: Secret::new(token.clone()),
            expires_at,
        });

        metrics::counter!("twitch_token_refreshes_total", "outcome" => "success").increment(1);
        info!(
            expires_in = response.expires_in,
            usable_for_secs = lifetime.as_secs(),
            "app access token refreshed"
        );

        Ok(token)
    }

    /// Drop the cached credential so the next `token()` call re-exchanges.
    pub async fn invalidate(&self) {
        let mut slot = self.credential.lock().await;
        if slot.take().is_some() {
            debug!("app access token invalidated");
        }
    }

    /// Expiry of the cached credential, `None` when nothing is cached.
    pub async fn expires_at(&self) -> Option<Instant> {
        self.credential.lock().await.as_ref().map(|c| c.expires_at)
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .finish_non_exhaustive()
    }
}
