//! Telemetry metric name constants.
//!
//! Centralised metric names for marquee operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `marquee_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `status` — outcome: "ok" or "error"

/// Upstream page attempts, one per HTTP round trip.
///
/// Labels: `status` ("ok" | "error").
pub const PAGE_FETCHES_TOTAL: &str = "marquee_page_fetches_total";

/// Duration of a single page attempt in seconds.
pub const PAGE_FETCH_DURATION_SECONDS: &str = "marquee_page_fetch_duration_seconds";

/// Total retry attempts (not counting the initial request).
pub const RETRIES_TOTAL: &str = "marquee_retries_total";

/// Result cache hits.
pub const CACHE_HITS_TOTAL: &str = "marquee_cache_hits_total";

/// Result cache misses.
pub const CACHE_MISSES_TOTAL: &str = "marquee_cache_misses_total";

/// Calls rejected by the rate gate.
pub const RATE_LIMITED_TOTAL: &str = "marquee_rate_limited_total";

/// Full pagination runs.
///
/// Labels: `status` ("ok" | "error").
pub const AGGREGATIONS_TOTAL: &str = "marquee_aggregations_total";
