//! Result cache for director queries.
//!
//! [`ResultCache`] maps a threshold to the [`DirectorResult`] computed for
//! it. Entries expire a fixed time after they were written (reads do not
//! extend them) and the cache never holds more than `max_entries`.
//!
//! # Architecture
//!
//! The cache is shared by the [`Aggregator`](crate::Aggregator), which
//! writes after every successful run, and the
//! [`DirectorService`](crate::DirectorService), which reads before
//! starting one. A hit bypasses pagination entirely.
//!
//! Concurrent misses for the same threshold are not coalesced: each
//! caller runs its own aggregation and the last write wins. Both writes
//! hold the same value for an unchanged upstream.
//!
//! # Eviction
//!
//! Backed by moka with its LRU eviction policy. Eviction and expiry are
//! applied lazily by moka's housekeeping, so [`ResultCache::len`] may lag
//! behind; expired entries are never returned by [`ResultCache::get`].

use std::time::Duration;

use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::telemetry;
use crate::types::DirectorResult;

/// Configuration for the result cache.
///
/// ```rust
/// # use marquee::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(1_000)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached thresholds. Default: 100.
    pub max_entries: u64,
    /// Time-to-live measured from the write. Default: 3 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(180),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Bounded, write-expiring store of threshold → directors.
#[derive(Clone)]
pub struct ResultCache {
    cache: Cache<i64, DirectorResult>,
}

impl ResultCache {
    /// Create a new result cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { cache }
    }

    /// Look up the directors cached for `threshold`.
    ///
    /// Returns `None` on miss or expiry. Emits cache hit/miss metrics.
    pub async fn get(&self, threshold: i64) -> Option<DirectorResult> {
        match self.cache.get(&threshold).await {
            Some(result) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(result)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert (or overwrite) the directors for `threshold`.
    ///
    /// Overwriting restarts the entry's time-to-live.
    pub async fn insert(&self, threshold: i64, result: DirectorResult) {
        self.cache.insert(threshold, result).await;
    }

    /// Whether `threshold` has a live entry. Does not touch metrics.
    pub fn contains(&self, threshold: i64) -> bool {
        self.cache.contains_key(&threshold)
    }

    /// Drop the entry for `threshold`, if any.
    pub async fn invalidate(&self, threshold: i64) {
        self.cache.invalidate(&threshold).await;
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of entries currently held.
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending evictions and expirations now.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
