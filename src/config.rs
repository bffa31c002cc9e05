//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.marquee/config.toml` (user)
//! 3. `/etc/marquee/config.toml` (system)
//!
//! Every key is optional. The upstream URL has no default; it comes from
//! the file, from `MARQUEE_MOVIES_URL`, or from the caller.
//!
//! ```toml
//! [upstream]
//! movies_url = "https://movies.example.com/api/movies/search"
//! max_concurrent_requests = 5
//!
//! [upstream.retry]
//! max_retries = 3
//!
//! [cache]
//! ttl_secs = 180
//!
//! [rate_limit]
//! capacity = 3
//! window_secs = 60
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::client::{ClientConfig, RetryConfig};
use crate::gate::RateGateConfig;
use crate::service::DirectorServiceBuilder;
use crate::{MarqueeError, Result};

/// Environment variable that overrides `upstream.movies_url`.
pub const MOVIES_URL_ENV: &str = "MARQUEE_MOVIES_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
}

/// Upstream movie API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub movies_url: Option<String>,
    /// Connect timeout in milliseconds (default: 5000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Response timeout in milliseconds (default: 10000).
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Concurrent upstream connections (default: 500).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle pooled connection lifetime in seconds (default: 20).
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
    /// Concurrent page fetches per aggregation (default: 5).
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Per-page deadline including retries, in seconds (default: 15).
    #[serde(default = "default_fetch_deadline_secs")]
    pub fetch_deadline_secs: u64,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            movies_url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            max_connections: default_max_connections(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
            fetch_deadline_secs: default_fetch_deadline_secs(),
            retry: RetrySection::default(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_response_timeout_ms() -> u64 {
    10_000
}

fn default_max_connections() -> usize {
    500
}

fn default_pool_idle_timeout_secs() -> u64 {
    20
}

fn default_max_concurrent_requests() -> usize {
    5
}

fn default_fetch_deadline_secs() -> u64 {
    15
}

/// Page retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Retries after the first attempt (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff in milliseconds, doubled per retry (default: 1000).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds (default: 5000).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Maximum cached thresholds (default: 100).
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
    /// Entry lifetime from write, in seconds (default: 180).
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_max_entries() -> u64 {
    100
}

fn default_cache_ttl_secs() -> u64 {
    180
}

/// Rate gate settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    /// Calls admitted per window (default: 3).
    #[serde(default = "default_rate_capacity")]
    pub capacity: u32,
    /// Window length in seconds (default: 60).
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            capacity: default_rate_capacity(),
            window_secs: default_rate_window_secs(),
        }
    }
}

fn default_rate_capacity() -> u32 {
    3
}

fn default_rate_window_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.marquee/config.toml`
    /// 3. `/etc/marquee/config.toml`
    ///
    /// `MARQUEE_MOVIES_URL` is applied on top of the file.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let mut config = Self::load_from_file(&path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Like [`load`](Self::load), but falls back to defaults when no
    /// standard config file exists. An explicit path must still exist.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        if explicit_path.is_some() {
            return Self::load(explicit_path);
        }
        let mut config = match Self::standard_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MarqueeError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MarqueeError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MarqueeError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(MarqueeError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Self::standard_paths()
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| {
                MarqueeError::Configuration(
                    "No config file found. Create ~/.marquee/config.toml or /etc/marquee/config.toml"
                        .to_string(),
                )
            })
    }

    fn standard_paths() -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".marquee").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/marquee/config.toml"));
        paths
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(MOVIES_URL_ENV).filter(|u| !u.is_empty()) {
            self.upstream.movies_url = Some(url);
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        match self.upstream.movies_url.as_deref() {
            None | Some("") => {
                return Err(MarqueeError::Configuration(format!(
                    "upstream.movies_url is not set (or set {MOVIES_URL_ENV})"
                )));
            }
            Some(_) => {}
        }
        if self.upstream.max_concurrent_requests == 0 {
            return Err(MarqueeError::Configuration(
                "upstream.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.upstream.max_connections == 0 {
            return Err(MarqueeError::Configuration(
                "upstream.max_connections must be at least 1".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(MarqueeError::Configuration(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.capacity == 0 {
            return Err(MarqueeError::Configuration(
                "rate_limit.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        let retry = &self.upstream.retry;
        RetryConfig::new()
            .max_attempts(retry.max_retries.saturating_add(1))
            .initial_delay(Duration::from_millis(retry.initial_backoff_ms))
            .max_delay(Duration::from_millis(retry.max_backoff_ms))
    }

    pub fn client_config(&self) -> ClientConfig {
        let upstream = &self.upstream;
        ClientConfig::new(upstream.movies_url.clone().unwrap_or_default())
            .connect_timeout(Duration::from_millis(upstream.connect_timeout_ms))
            .response_timeout(Duration::from_millis(upstream.response_timeout_ms))
            .max_connections(upstream.max_connections)
            .pool_idle_timeout(Duration::from_secs(upstream.pool_idle_timeout_secs))
            .deadline(Duration::from_secs(upstream.fetch_deadline_secs))
            .retry(self.retry_config())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache.max_entries)
            .ttl(Duration::from_secs(self.cache.ttl_secs))
    }

    pub fn rate_gate_config(&self) -> RateGateConfig {
        RateGateConfig::new()
            .capacity(self.rate_limit.capacity)
            .window(Duration::from_secs(self.rate_limit.window_secs))
    }

    /// A service builder carrying every setting from this config.
    pub fn service_builder(&self) -> Result<DirectorServiceBuilder> {
        self.validate()?;
        Ok(DirectorServiceBuilder::new()
            .client_config(self.client_config())
            .max_concurrent_requests(self.upstream.max_concurrent_requests)
            .cache(self.cache_config())
            .rate_gate(self.rate_gate_config()))
    }
}
