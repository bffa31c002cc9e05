//! Upstream movie payloads

use serde::{Deserialize, Serialize};

/// One movie as listed by the upstream API.
///
/// Only `director` feeds the tally; everything else the API sends is
/// tolerated and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(alias = "Director")]
    pub director: String,
}

impl Movie {
    pub fn new(title: impl Into<String>, director: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            director: director.into(),
        }
    }
}

/// One page of the upstream listing (`GET {movies_url}?page={n}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePage {
    #[serde(default, rename = "page")]
    pub page_number: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, rename = "data")]
    pub movies: Vec<Movie>,
}

impl MoviePage {
    /// Build a page without the informational `per_page` / `total` fields.
    pub fn new(page_number: u32, total_pages: u32, movies: Vec<Movie>) -> Self {
        Self {
            page_number,
            per_page: movies.len() as u32,
            total: 0,
            total_pages,
            movies,
        }
    }
}
