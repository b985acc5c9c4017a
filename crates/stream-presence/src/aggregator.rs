//! Presence aggregation over the Helix streams endpoint
//!
//! One token lookup, one streams request, one map. The map is seeded with
//! every requested login set to `false` before the response is read, so a
//! login the endpoint doesn't mention is reported offline rather than
//! missing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, instrument, warn};
use twitch_auth::TokenCache;

use crate::error::{Error, Result};
use crate::helix::StreamsResponse;

/// Lower-cased login -> is live.
pub type PresenceMap = BTreeMap<String, bool>;

/// Builds presence maps for a fixed list of logins.
///
/// The token cache is shared with anything else that needs an app token;
/// the login list is fixed at construction and used by `check_configured`.
#[derive(Debug)]
pub struct StatusAggregator {
    tokens: Arc<TokenCache>,
    client: reqwest::Client,
    endpoint: String,
    logins: Vec<String>,
    timeout: Duration,
}

impl StatusAggregator {
    pub fn new(
        tokens: Arc<TokenCache>,
        client: reqwest::Client,
        endpoint: impl Into<String>,
        logins: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            client,
            endpoint: endpoint.into(),
            logins,
            timeout,
        }
    }

    /// Logins passed at construction, in configured order.
    pub fn logins(&self) -> &[String] {
        &self.logins
    }

    /// Presence for the configured logins.
    pub async fn check_configured(&self) -> Result<PresenceMap> {
        self.check_streamers(&self.logins).await
    }

    /// Presence for `logins`, matched case-insensitively.
    ///
    /// The returned key set is exactly the lower-cased input. Records for
    /// logins outside the request are ignored.
    #[instrument(skip_all, fields(logins = logins.len()))]
    pub async fn check_streamers<S: AsRef<str>>(&self, logins: &[S]) -> Result<PresenceMap> {
        if logins.is_empty() {
            return Ok(PresenceMap::new());
        }

        let token = self.tokens.token().await?;

        let params: Vec<(&str, &str)> = logins
            .iter()
            .map(|login| ("user_login", login.as_ref()))
            .collect();

        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .query(&params)
            .header("Client-ID", self.tokens.client_id())
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::query(
                        None,
                        format!("streams request timed out after {:?}", self.timeout),
                    )
                } else {
                    Error::query(None, format!("streams request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                // Token was revoked before its declared expiry
                warn!("streams endpoint rejected app access token, invalidating cache");
                self.tokens.invalidate().await;
            }
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::query(
                Some(status.as_u16()),
                format!("streams endpoint returned {status}: {body}"),
            ));
        }

        let streams = response
            .json::<StreamsResponse>()
            .await
            .map_err(|e| {
                Error::query(
                    Some(status.as_u16()),
                    format!("invalid streams response: {e}"),
                )
            })?;

        let mut presence: PresenceMap = logins
            .iter()
            .map(|login| (login.as_ref().to_lowercase(), false))
            .collect();

        for record in &streams.data {
            let login = record.user_login.to_lowercase();
            match presence.get_mut(&login) {
                Some(live) => *live = true,
                None => debug!(login = %login, "ignoring stream record for unrequested login"),
            }
        }

        let live = presence.values().filter(|live| **live).count();
        metrics::gauge!("stream_presence_live_logins").set(live as f64);
        debug!(live, total = presence.len(), "presence map built");

        Ok(presence)
    }
}
