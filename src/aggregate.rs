//! Full-listing pagination and director tallies.
//!
//! [`Aggregator::aggregate`] fetches page 1 on its own (it carries
//! `total_pages`), then fans out over pages `2..=total_pages` with at most
//! `max_concurrent_requests` fetches in flight. Pages are folded into one
//! tally by the driving task as they complete, so completion order does
//! not matter and no count is lost or doubled.
//!
//! The first page failure ends the run: the remaining in-flight fetches
//! are dropped and nothing is cached.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::client::PageClient;
use crate::telemetry;
use crate::types::{DirectorResult, Movie};
use crate::Result;

/// Default cap on concurrent page fetches after page 1.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Drives one pagination run per call and caches successful results.
pub struct Aggregator {
    client: Arc<PageClient>,
    cache: ResultCache,
    max_concurrent_requests: usize,
}

impl Aggregator {
    pub fn new(client: Arc<PageClient>, cache: ResultCache) -> Self {
        Self {
            client,
            cache,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    /// Set the cap on concurrent page fetches (values below 1 act as 1).
    pub fn max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n.max(1);
        self
    }

    /// Directors with more than `threshold` movies across every page.
    ///
    /// A negative threshold yields an empty result without any upstream
    /// call or cache write.
    pub async fn aggregate(&self, threshold: i64) -> Result<DirectorResult> {
        if threshold < 0 {
            return Ok(DirectorResult::empty());
        }

        let counts = match self.fetch_and_count().await {
            Ok(counts) => {
                metrics::counter!(telemetry::AGGREGATIONS_TOTAL, "status" => "ok").increment(1);
                counts
            }
            Err(e) => {
                metrics::counter!(telemetry::AGGREGATIONS_TOTAL, "status" => "error")
                    .increment(1);
                return Err(e);
            }
        };

        let result = select_directors(&counts, threshold);
        self.cache.insert(threshold, result.clone()).await;
        info!(
            threshold,
            counted = counts.len(),
            selected = result.len(),
            "aggregation complete"
        );
        Ok(result)
    }

    async fn fetch_and_count(&self) -> Result<HashMap<String, u64>> {
        let first = self.client.fetch_page(1).await?;
        let total_pages = first.total_pages;
        debug!(total_pages, "fetched first page");

        let mut counts = HashMap::new();
        count_directors(&mut counts, &first.movies);
        if total_pages <= 1 {
            return Ok(counts);
        }

        let mut pages = stream::iter(2..=total_pages)
            .map(|page| self.client.fetch_page(page))
            .buffer_unordered(self.max_concurrent_requests);

        while let Some(page) = pages.next().await {
            count_directors(&mut counts, &page?.movies);
        }
        Ok(counts)
    }
}

/// Add one to each movie's director in `counts`.
pub fn count_directors(counts: &mut HashMap<String, u64>, movies: &[Movie]) {
    for movie in movies {
        *counts.entry(movie.director.clone()).or_insert(0) += 1;
    }
}

/// Directors whose count is strictly greater than `threshold`, sorted.
///
/// Negative thresholds select nobody.
pub fn select_directors(counts: &HashMap<String, u64>, threshold: i64) -> DirectorResult {
    let Ok(threshold) = u64::try_from(threshold) else {
        return DirectorResult::empty();
    };
    DirectorResult::new(
        counts
            .iter()
            .filter(|(_, count)| **count > threshold)
            .map(|(director, _)| director.as_str()),
    )
}
