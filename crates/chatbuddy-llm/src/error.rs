//! Completion failures

use thiserror::Error;

/// Why a completion request produced no reply
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials or settings; raised before any request is sent
    #[error("completion service not configured: {0}")]
    NotConfigured(String),

    /// The service refused the request (bad key, bad request)
    #[error("completion request rejected: {0}")]
    Api(String),

    /// Rate limit or quota hit after all retries
    #[error("completion service rate limit reached")]
    RateLimit,

    /// 5xx from the service after all retries
    #[error("completion service unavailable: {0}")]
    ServerError(String),

    /// Reply could not be read as a completion
    #[error("unreadable completion reply: {0}")]
    InvalidResponse(String),

    /// Connection-level failure
    #[error("could not reach completion service: {0}")]
    Network(String),

    /// No reply within the configured timeout (milliseconds)
    #[error("no reply within {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Whether the same request may succeed if sent again later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::ServerError(_) | Self::Network(_) | Self::Timeout(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
