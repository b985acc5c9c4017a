//! Error types for status aggregation

/// Errors from building a presence map.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token cache could not produce an app access token.
    #[error("upstream auth failed: {0}")]
    UpstreamAuth(#[from] twitch_auth::Error),

    /// The streams query failed in transport, answered non-2xx, or sent a
    /// body that doesn't parse.
    #[error("upstream query failed: {message}")]
    UpstreamQuery {
        status: Option<u16>,
        message: String,
    },
}

impl Error {
    pub(crate) fn query(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::UpstreamQuery {
            status,
            message: message.into(),
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UpstreamAuth(_) => "auth",
            Error::UpstreamQuery { .. } => "query",
        }
    }
}

/// Result alias for aggregation.
pub type Result<T> = std::result::Result<T, Error>;
