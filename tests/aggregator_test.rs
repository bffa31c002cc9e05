//! Tests for [`Aggregator`] — pagination fan-out, tallying and caching.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use marquee::{
    Aggregator, FetchError, MarqueeError, Movie, MoviePage, PageClient, PageSource, ResultCache,
    RetryConfig,
};

/// In-memory listing that records calls and peak concurrency.
struct ScriptedSource {
    pages: Vec<MoviePage>,
    failing: HashSet<u32>,
    delay: Duration,
    calls: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedSource {
    /// One page per slice, each movie named after its director.
    fn listing(pages: &[&[&str]]) -> Self {
        let total = pages.len() as u32;
        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, directors)| {
                let movies = directors
                    .iter()
                    .enumerate()
                    .map(|(j, d)| Movie::new(format!("{d} #{i}.{j}"), *d))
                    .collect();
                MoviePage::new(i as u32 + 1, total, movies)
            })
            .collect();
        Self {
            pages,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn failing_on(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, page: u32) -> Result<MoviePage, FetchError> {
        self.calls.lock().unwrap().push(page);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&page) {
            return Err(FetchError::Api {
                status: 500,
                message: "upstream exploded".into(),
            });
        }
        self.pages
            .get(page as usize - 1)
            .cloned()
            .ok_or_else(|| FetchError::Api {
                status: 404,
                message: format!("no page {page}"),
            })
    }
}

fn aggregator(source: &Arc<ScriptedSource>, cache: &ResultCache) -> Aggregator {
    let client = PageClient::new(source.clone()).with_retry(RetryConfig::disabled());
    Aggregator::new(Arc::new(client), cache.clone())
}

// =========================================================================
// Reference scenarios
// =========================================================================

#[tokio::test]
async fn single_page_threshold_two() {
    let source = Arc::new(ScriptedSource::listing(&[&["A", "A", "A", "B", "B", "C"]]));
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache).aggregate(2).await.unwrap();

    assert_eq!(result.directors, vec!["A"]);
    assert_eq!(source.calls(), vec![1]);
}

#[tokio::test]
async fn single_movie_threshold_zero() {
    let source = Arc::new(ScriptedSource::listing(&[&["Director A"]]));
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache).aggregate(0).await.unwrap();

    assert_eq!(result.directors, vec!["Director A"]);
}

#[tokio::test]
async fn two_pages_are_both_counted() {
    let source = Arc::new(ScriptedSource::listing(&[&["A", "A"], &["B", "B", "B"]]));
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache).aggregate(1).await.unwrap();

    assert_eq!(result.directors, vec!["A", "B"]);
    assert_eq!(source.calls(), vec![1, 2]);
}

// =========================================================================
// Threshold semantics
// =========================================================================

#[tokio::test]
async fn negative_threshold_makes_no_calls_and_no_cache_write() {
    let source = Arc::new(ScriptedSource::listing(&[&["A", "B"]]));
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache).aggregate(-1).await.unwrap();

    assert!(result.is_empty());
    assert!(source.calls().is_empty());
    cache.run_pending_tasks().await;
    assert!(!cache.contains(-1));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn counts_span_pages_for_the_same_director() {
    let source = Arc::new(ScriptedSource::listing(&[
        &["Kurosawa", "Ozu"],
        &["Kurosawa"],
        &["Kurosawa", "Ozu"],
    ]));
    let cache = ResultCache::default();
    let aggregator = aggregator(&source, &cache);

    assert_eq!(aggregator.aggregate(2).await.unwrap().directors, vec!["Kurosawa"]);
    assert_eq!(
        aggregator.aggregate(1).await.unwrap().directors,
        vec!["Kurosawa", "Ozu"]
    );
    assert!(aggregator.aggregate(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn matches_an_independent_tally() {
    let names = ["Varda", "varda", "Lynch", "Chen Kaige", "Denis", "Wong"];
    let pages: Vec<Vec<&str>> = (0..9)
        .map(|p| (0..(p % 4 + 3)).map(|i| names[(p * 7 + i * 3) % names.len()]).collect())
        .collect();
    let page_refs: Vec<&[&str]> = pages.iter().map(|p| p.as_slice()).collect();

    let mut expected: BTreeMap<&str, u64> = BTreeMap::new();
    for director in pages.iter().flatten() {
        *expected.entry(*director).or_default() += 1;
    }

    let source = Arc::new(ScriptedSource::listing(&page_refs));
    let cache = ResultCache::default();
    let aggregator = aggregator(&source, &cache).max_concurrent_requests(3);

    for threshold in 0..8 {
        let result = aggregator.aggregate(threshold).await.unwrap();
        let want: Vec<&str> = expected
            .iter()
            .filter(|(_, count)| **count > threshold as u64)
            .map(|(d, _)| *d)
            .collect();
        assert_eq!(result.directors, want, "threshold {threshold}");
        assert!(result.directors.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn zero_total_pages_means_first_page_only() {
    let mut source = ScriptedSource::listing(&[&["A"]]);
    source.pages[0].total_pages = 0;
    let source = Arc::new(source);
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache).aggregate(0).await.unwrap();

    assert_eq!(result.directors, vec!["A"]);
    assert_eq!(source.calls(), vec![1]);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(start_paused = true)]
async fn fan_out_never_exceeds_concurrency_cap() {
    let pages: Vec<&[&str]> = vec![&["A"][..]; 20];
    let source = Arc::new(ScriptedSource::listing(&pages).with_delay(Duration::from_millis(50)));
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache)
        .max_concurrent_requests(5)
        .aggregate(19)
        .await
        .unwrap();

    assert_eq!(result.directors, vec!["A"]);
    assert_eq!(source.peak(), 5);

    let calls = source.calls();
    assert_eq!(calls[0], 1, "page 1 goes first");
    let mut rest: Vec<u32> = calls[1..].to_vec();
    rest.sort_unstable();
    assert_eq!(rest, (2..=20).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn cap_of_one_fetches_sequentially() {
    let pages: Vec<&[&str]> = vec![&["A"][..]; 6];
    let source = Arc::new(ScriptedSource::listing(&pages).with_delay(Duration::from_millis(10)));
    let cache = ResultCache::default();

    aggregator(&source, &cache)
        .max_concurrent_requests(1)
        .aggregate(0)
        .await
        .unwrap();

    assert_eq!(source.peak(), 1);
    assert_eq!(source.calls(), vec![1, 2, 3, 4, 5, 6]);
}

// =========================================================================
// Failures and caching
// =========================================================================

#[tokio::test]
async fn success_populates_cache() {
    let source = Arc::new(ScriptedSource::listing(&[&["A", "A"]]));
    let cache = ResultCache::default();

    let result = aggregator(&source, &cache).aggregate(1).await.unwrap();

    assert_eq!(cache.get(1).await, Some(result));
}

#[tokio::test]
async fn failing_page_aborts_and_caches_nothing() {
    let source = Arc::new(
        ScriptedSource::listing(&[&["A"], &["A"], &["A"], &["A"]]).failing_on(3),
    );
    let cache = ResultCache::default();

    let err = aggregator(&source, &cache).aggregate(0).await.unwrap_err();

    match err {
        MarqueeError::UpstreamFetch { page, cause } => {
            assert_eq!(page, 3);
            assert!(matches!(cause, FetchError::Api { status: 500, .. }));
        }
        other => panic!("expected UpstreamFetch, got {other:?}"),
    }
    assert!(cache.get(0).await.is_none());
}

#[tokio::test]
async fn failing_first_page_stops_before_fan_out() {
    let source = Arc::new(ScriptedSource::listing(&[&["A"], &["B"]]).failing_on(1));
    let cache = ResultCache::default();

    let err = aggregator(&source, &cache).aggregate(0).await.unwrap_err();

    assert_eq!(err.page(), Some(1));
    assert_eq!(source.calls(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn failing_page_is_retried_before_aborting() {
    let source = Arc::new(ScriptedSource::listing(&[&["A"], &["B"]]).failing_on(2));
    let cache = ResultCache::default();
    let client = PageClient::new(source.clone()).with_retry(RetryConfig::default());
    let aggregator = Aggregator::new(Arc::new(client), cache.clone());

    let err = aggregator.aggregate(0).await.unwrap_err();

    assert_eq!(err.page(), Some(2));
    let page_two_calls = source.calls().iter().filter(|p| **p == 2).count();
    assert_eq!(page_two_calls, 4, "initial attempt plus three retries");
    assert!(!cache.contains(0));
}
