//! Upstream page fetching.
//!
//! - [`PageSource`] — one attempt at one page. [`HttpPageSource`] is the
//!   production implementation; tests plug in their own.
//! - [`PageClient`] — wraps a source with retry-with-backoff and an
//!   overall deadline, and turns the final failure into
//!   [`MarqueeError::UpstreamFetch`].

pub mod http;
pub mod retry;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

pub use http::HttpPageSource;
pub use retry::RetryConfig;

use crate::error::FetchError;
use crate::telemetry;
use crate::types::MoviePage;
use crate::{MarqueeError, Result};

/// A single-attempt source of movie pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch page `page` (1-based) once.
    async fn fetch(&self, page: u32) -> std::result::Result<MoviePage, FetchError>;
}

/// Settings for the HTTP client and the per-page retry envelope.
///
/// ```rust
/// # use marquee::ClientConfig;
/// # use std::time::Duration;
/// let config = ClientConfig::new("http://localhost:8080/api/movies/search")
///     .connect_timeout(Duration::from_secs(2))
///     .max_connections(64);
/// assert_eq!(config.response_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upstream listing endpoint; `?page=n` is appended per request.
    pub movies_url: String,
    /// TCP connect timeout. Default: 5s.
    pub connect_timeout: Duration,
    /// Per-request response timeout. Default: 10s.
    pub response_timeout: Duration,
    /// Maximum concurrent upstream requests across all fetches. Default: 500.
    pub max_connections: usize,
    /// Idle pooled connections are closed after this long. Default: 20s.
    pub pool_idle_timeout: Duration,
    /// Deadline for one page including all retries. Default: 15s.
    pub deadline: Duration,
    /// Retry policy for failed attempts.
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(movies_url: impl Into<String>) -> Self {
        Self {
            movies_url: movies_url.into(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(10),
            max_connections: 500,
            pool_idle_timeout: Duration::from_secs(20),
            deadline: Duration::from_secs(15),
            retry: RetryConfig::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Fetches pages with retry and an overall deadline.
///
/// Cheap to share: hold it in an `Arc` and call [`fetch_page`](Self::fetch_page)
/// from as many tasks as needed.
pub struct PageClient {
    source: Arc<dyn PageSource>,
    retry: RetryConfig,
    deadline: Duration,
}

impl PageClient {
    /// Wrap a source with the default retry policy and a 15s deadline.
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            retry: RetryConfig::default(),
            deadline: Duration::from_secs(15),
        }
    }

    /// Build a client over [`HttpPageSource`] from `config`.
    pub fn http(config: &ClientConfig) -> Result<Self> {
        let source = HttpPageSource::new(config)?;
        Ok(Self::new(Arc::new(source))
            .with_retry(config.retry.clone())
            .with_deadline(config.deadline))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetch one page, retrying any failure until the attempts or the
    /// deadline run out. No partial page is ever returned.
    pub async fn fetch_page(&self, page: u32) -> Result<MoviePage> {
        let attempts = retry::with_retry(&self.retry, page, || self.attempt(page));
        match tokio::time::timeout(self.deadline, attempts).await {
            Ok(Ok(movies)) => Ok(movies),
            Ok(Err(cause)) => Err(MarqueeError::UpstreamFetch { page, cause }),
            Err(_) => Err(MarqueeError::UpstreamFetch {
                page,
                cause: FetchError::Timeout(self.deadline),
            }),
        }
    }

    async fn attempt(&self, page: u32) -> std::result::Result<MoviePage, FetchError> {
        let start = Instant::now();
        let result = self.source.fetch(page).await;
        let status = if result.is_ok() { "ok" } else { "error" };

        metrics::counter!(telemetry::PAGE_FETCHES_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::PAGE_FETCH_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        result
    }
}
