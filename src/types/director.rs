//! Aggregation result type

use serde::{Deserialize, Serialize};

/// Directors whose tally exceeded the requested threshold.
///
/// `directors` is always strictly ascending (byte-wise, case-sensitive)
/// with no duplicates; [`DirectorResult::new`] enforces this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorResult {
    pub directors: Vec<String>,
}

impl DirectorResult {
    /// Build a result from directors in any order.
    pub fn new<I, S>(directors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut directors: Vec<String> = directors.into_iter().map(Into::into).collect();
        directors.sort_unstable();
        directors.dedup();
        Self { directors }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.directors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directors.is_empty()
    }

    pub fn contains(&self, director: &str) -> bool {
        self.directors
            .binary_search_by(|d| d.as_str().cmp(director))
            .is_ok()
    }
}
