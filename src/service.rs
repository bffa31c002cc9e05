//! The director query facade and its builder.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::aggregate::{Aggregator, DEFAULT_MAX_CONCURRENT_REQUESTS};
use crate::cache::{CacheConfig, ResultCache};
use crate::client::{ClientConfig, PageClient, PageSource, RetryConfig};
use crate::gate::{RateGate, RateGateConfig};
use crate::telemetry;
use crate::types::DirectorResult;
use crate::{MarqueeError, Result};

/// Answers "which directors have directed more than N movies?".
///
/// Every call passes the shared [`RateGate`] first, then the
/// [`ResultCache`], and only on a miss runs a full pagination through the
/// [`Aggregator`]. Safe to share behind an `Arc` across any number of
/// concurrent callers.
///
/// ```rust,no_run
/// # async fn run() -> marquee::Result<()> {
/// let service = marquee::DirectorService::builder()
///     .movies_url("https://movies.example.com/api/movies/search")
///     .build()?;
///
/// let result = service.get_directors_by_threshold(4).await?;
/// println!("{:?}", result.directors);
/// # Ok(())
/// # }
/// ```
pub struct DirectorService {
    gate: Arc<RateGate>,
    cache: ResultCache,
    aggregator: Aggregator,
}

impl DirectorService {
    /// Create a new builder for configuring the service.
    pub fn builder() -> DirectorServiceBuilder {
        DirectorServiceBuilder::new()
    }

    /// Assemble a service from already-built parts.
    ///
    /// `cache` should be the same cache the aggregator writes to.
    pub fn new(gate: Arc<RateGate>, cache: ResultCache, aggregator: Aggregator) -> Self {
        Self {
            gate,
            cache,
            aggregator,
        }
    }

    /// Directors with strictly more than `threshold` movies, sorted.
    ///
    /// Fails with [`MarqueeError::RateLimitExceeded`] before touching the
    /// cache or upstream when the gate is closed, and with
    /// [`MarqueeError::UpstreamFetch`] when any page cannot be fetched.
    pub async fn get_directors_by_threshold(&self, threshold: i64) -> Result<DirectorResult> {
        if let Err(retry_after) = self.gate.acquire() {
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            warn!(
                threshold,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit exceeded"
            );
            return Err(MarqueeError::RateLimitExceeded { retry_after });
        }

        if threshold >= 0 {
            if let Some(cached) = self.cache.get(threshold).await {
                info!(threshold, "returning cached directors");
                return Ok(cached);
            }
        }

        self.aggregator.aggregate(threshold).await
    }

    /// Liveness probe. Consumes no permit and makes no upstream call.
    pub fn health(&self) -> &'static str {
        "ok"
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }
}

/// Builder for [`DirectorService`].
///
/// Without a custom [`PageSource`], the service talks HTTP to
/// `movies_url`, which then must be set.
pub struct DirectorServiceBuilder {
    client: ClientConfig,
    source: Option<Arc<dyn PageSource>>,
    max_concurrent_requests: usize,
    cache: CacheConfig,
    rate_gate: RateGateConfig,
    shared_cache: Option<ResultCache>,
    shared_gate: Option<Arc<RateGate>>,
}

impl DirectorServiceBuilder {
    pub fn new() -> Self {
        Self {
            client: ClientConfig::new(""),
            source: None,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            cache: CacheConfig::default(),
            rate_gate: RateGateConfig::default(),
            shared_cache: None,
            shared_gate: None,
        }
    }

    /// Upstream listing endpoint.
    pub fn movies_url(mut self, url: impl Into<String>) -> Self {
        self.client.movies_url = url.into();
        self
    }

    /// Replace all HTTP client settings (including the URL).
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client = config;
        self
    }

    /// Fetch pages from `source` instead of over HTTP.
    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Retry policy for failed page attempts.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.client.retry = retry;
        self
    }

    /// Overall deadline for one page, retries included.
    pub fn fetch_deadline(mut self, deadline: Duration) -> Self {
        self.client.deadline = deadline;
        self
    }

    /// Cap on concurrent page fetches after page 1 (default: 5).
    pub fn max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n;
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn rate_gate(mut self, config: RateGateConfig) -> Self {
        self.rate_gate = config;
        self
    }

    /// Use an existing cache instead of creating one from [`cache`](Self::cache).
    pub fn shared_cache(mut self, cache: ResultCache) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    /// Use an existing gate instead of creating one from [`rate_gate`](Self::rate_gate).
    pub fn shared_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.shared_gate = Some(gate);
        self
    }

    pub fn build(self) -> Result<DirectorService> {
        let client = match self.source {
            Some(source) => PageClient::new(source)
                .with_retry(self.client.retry.clone())
                .with_deadline(self.client.deadline),
            None => PageClient::http(&self.client)?,
        };

        let cache = self
            .shared_cache
            .unwrap_or_else(|| ResultCache::new(&self.cache));
        let gate = self
            .shared_gate
            .unwrap_or_else(|| Arc::new(RateGate::new(&self.rate_gate)));
        let aggregator = Aggregator::new(Arc::new(client), cache.clone())
            .max_concurrent_requests(self.max_concurrent_requests);

        Ok(DirectorService::new(gate, cache, aggregator))
    }
}

impl Default for DirectorServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
