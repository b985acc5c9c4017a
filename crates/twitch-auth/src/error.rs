//! Error types for the identity exchange

use std::time::Duration;

/// Failures obtaining an app access token. Every variant means the relay
/// could not authenticate against the upstream identity provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("identity request failed: {0}")]
    Http(String),

    #[error("identity request timed out after {0:?}")]
    Timeout(Duration),

    #[error("identity provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// HTTP status returned by the identity provider, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
