//! HTTP page source for the upstream movie API.
//!
//! Issues `GET {movies_url}?page={n}` and decodes the JSON body into a
//! [`MoviePage`]. One attempt per call; retries and the overall deadline
//! belong to [`PageClient`](super::PageClient).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{ClientConfig, PageSource};
use crate::error::FetchError;
use crate::types::MoviePage;
use crate::{MarqueeError, Result};

/// Page source backed by a pooled reqwest client.
///
/// Clones share the same connection pool and the same bound on
/// concurrent requests.
#[derive(Clone)]
pub struct HttpPageSource {
    http: Client,
    movies_url: String,
    connections: Arc<Semaphore>,
}

impl HttpPageSource {
    /// Build a source from client settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.movies_url.is_empty() {
            return Err(MarqueeError::Configuration(
                "movies URL must not be empty".to_string(),
            ));
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.response_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .build()
            .map_err(|e| MarqueeError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            movies_url: config.movies_url.clone(),
            connections: Arc::new(Semaphore::new(config.max_connections.max(1))),
        })
    }

    pub fn movies_url(&self) -> &str {
        &self.movies_url
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, page: u32) -> std::result::Result<MoviePage, FetchError> {
        let _connection = self
            .connections
            .acquire()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let response = self
            .http
            .get(&self.movies_url)
            .query(&[("page", page)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let movies: MoviePage = serde_json::from_slice(&body)?;
        debug!(
            page,
            movies = movies.movies.len(),
            total_pages = movies.total_pages,
            "fetched page"
        );
        Ok(movies)
    }
}
