//! Marquee error types

use std::time::Duration;

/// Failure of a single upstream page attempt.
///
/// Every variant is retried by [`PageClient`](crate::client::PageClient);
/// the last one seen is carried by [`MarqueeError::UpstreamFetch`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FetchError::Http(err.to_string()),
        }
    }
}

/// Marquee error types
#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    /// The rate gate denied the call. Nothing was read or fetched.
    #[error("rate limit exceeded, try again in {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    /// A page could not be fetched within its retry budget or deadline.
    /// The aggregation was aborted and nothing was cached.
    #[error("failed to fetch page {page}: {cause}")]
    UpstreamFetch {
        page: u32,
        #[source]
        cause: FetchError,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MarqueeError {
    /// Page number of a failed upstream fetch.
    pub fn page(&self) -> Option<u32> {
        match self {
            MarqueeError::UpstreamFetch { page, .. } => Some(*page),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MarqueeError::RateLimitExceeded { .. })
    }
}

/// Result type alias for Marquee operations
pub type Result<T> = std::result::Result<T, MarqueeError>;
