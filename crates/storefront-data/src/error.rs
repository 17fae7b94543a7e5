//! Error types for data loading.

use std::time::Duration;

/// Errors from the Storefront API client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("Storefront API error: {0}")]
    Api(String),

    #[error("Storefront API returned HTTP {status}")]
    Http { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Upstream could not be reached or did not answer in time.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Errors from session handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No session secret configured")]
    NoSecret,

    #[error("Session cookie signature mismatch")]
    BadSignature,

    #[error("Malformed session cookie: {0}")]
    Malformed(String),

    #[error("Session serialization error: {0}")]
    Serialization(String),
}
