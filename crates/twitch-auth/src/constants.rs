//! Twitch identity provider constants
//!
//! The app access token comes from the client-credentials grant: no user is
//! involved, so there is no redirect URI, scope or refresh token.

/// Token endpoint for the client-credentials exchange
pub const TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";

/// Grant type sent with every exchange
pub const GRANT_TYPE: &str = "client_credentials";

/// How long before the declared expiry a cached token is treated as expired.
/// Covers clock skew and the latency of the request that will carry it.
pub const SAFETY_MARGIN_SECS: u64 = 60;
