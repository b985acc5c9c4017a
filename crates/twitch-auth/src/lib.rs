//! Twitch app access token acquisition
//!
//! Exchanges the app's client id and secret for an app access token
//! (OAuth2 client-credentials grant) and caches it until shortly before it
//! expires. The crate has no dependency on the relay binary.
//!
//! Token flow:
//! 1. Caller asks `TokenCache::token()` for a token
//! 2. A valid cached token is returned as is
//! 3. Otherwise `token::exchange_client_credentials()` runs once, and the
//!    result is cached with a 60 second safety margin

pub mod cache;
pub mod constants;
pub mod error;
pub mod token;

pub use cache::TokenCache;
pub use constants::*;
pub use error::{Error, Result};
pub use token::{TokenResponse, exchange_client_credentials};
