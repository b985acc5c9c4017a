//! Live/offline presence for a list of Twitch logins
//!
//! `StatusAggregator` takes an app access token from a shared
//! `twitch_auth::TokenCache`, asks the Helix streams endpoint about every
//! login in one request, and folds the answer into a `PresenceMap` keyed by
//! lower-cased login.
//!
//! Request lifecycle:
//! 1. `TokenCache::token()` returns a cached or freshly exchanged token
//! 2. One GET with a `user_login` parameter per login
//! 3. Every login starts `false`; each returned live record flips its login
//!    to `true`
//! 4. Any failure discards the whole request; no partial maps

pub mod aggregator;
pub mod error;
pub mod helix;

pub use aggregator::{PresenceMap, StatusAggregator};
pub use error::{Error, Result};
pub use helix::{MAX_LOGINS_PER_REQUEST, STREAMS_ENDPOINT, StreamRecord, StreamsResponse};
