//! Helix streams endpoint types
//!
//! Only `user_login` is modelled; serde ignores the rest of each stream
//! record (display name, title, viewer count and so on).

use serde::Deserialize;

/// Streams endpoint. Returns one record per requested login that is live.
pub const STREAMS_ENDPOINT: &str = "https://api.twitch.tv/helix/streams";

/// Maximum `user_login` parameters accepted in one streams request.
pub const MAX_LOGINS_PER_REQUEST: usize = 100;

/// Body of a streams response: `{"data": [...], "pagination": {...}}`
#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<StreamRecord>,
}

/// A live stream.
#[derive(Debug, Deserialize)]
pub struct StreamRecord {
    pub user_login: String,
}
