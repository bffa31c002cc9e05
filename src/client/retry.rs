//! Retry configuration and delay calculation for page fetches.
//!
//! Every failure reaching this layer is retried: network errors,
//! non-success statuses and undecodable bodies alike. The overall
//! deadline around the loop lives in [`PageClient`](super::PageClient).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;
use crate::telemetry;

/// Configuration for retry behaviour on failed page fetches.
///
/// Uses exponential backoff capped at `max_delay`:
///
/// ```rust
/// # use marquee::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(2)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(0), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 4 (the initial request plus 3 retries).
    pub max_attempts: u32,
    /// Delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 5s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate the delay for a given retry number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Execute a page attempt with retry logic.
///
/// Retries any error up to `config.max_attempts` total attempts, sleeping
/// with exponential backoff between them. Returns the last error once the
/// attempts are spent.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    page: u32,
    f: F,
) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < config.max_attempts => {
                metrics::counter!(telemetry::RETRIES_TOTAL).increment(1);
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    page,
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying page fetch"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
