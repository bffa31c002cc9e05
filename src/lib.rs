//! Marquee - director tallies over a paginated movie API
//!
//! This crate answers one question: which directors have directed more
//! movies than a given threshold? It walks every page of an upstream
//! movie listing, counts movies per director and returns the qualifying
//! names in ascending order.
//!
//! The pipeline behind [`DirectorService::get_directors_by_threshold`]:
//!
//! 1. [`RateGate`] — shared, non-queuing permit window (3 calls / 60s by default)
//! 2. [`ResultCache`] — bounded, write-expiring cache keyed by threshold
//! 3. [`Aggregator`] — page 1, then the rest with bounded concurrency
//! 4. [`PageClient`] — per-page retry with backoff inside an overall deadline
//!
//! # Example
//!
//! ```rust,no_run
//! use marquee::{DirectorService, MarqueeError};
//!
//! #[tokio::main]
//! async fn main() -> marquee::Result<()> {
//!     let service = DirectorService::builder()
//!         .movies_url("https://movies.example.com/api/movies/search")
//!         .max_concurrent_requests(5)
//!         .build()?;
//!
//!     match service.get_directors_by_threshold(4).await {
//!         Ok(result) => println!("{:?}", result.directors),
//!         Err(MarqueeError::RateLimitExceeded { retry_after }) => {
//!             eprintln!("slow down, retry in {retry_after:?}")
//!         }
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod service;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use aggregate::Aggregator;
pub use cache::{CacheConfig, ResultCache};
pub use client::{ClientConfig, HttpPageSource, PageClient, PageSource, RetryConfig};
pub use config::Config;
pub use error::{FetchError, MarqueeError, Result};
pub use gate::{RateGate, RateGateConfig};
pub use service::{DirectorService, DirectorServiceBuilder};
pub use types::{DirectorResult, Movie, MoviePage};
