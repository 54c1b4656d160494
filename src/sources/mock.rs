//! Mock sources for testing purposes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::FilteringConfig;
use crate::models::{Cursor, FeedOutcome, Paper, PaperBuilder};
use crate::sources::{FeedSource, SearchSource, SourceError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A feed source that returns predefined outcomes per area.
///
/// Areas without a configured outcome behave like a not-modified feed.
#[derive(Debug, Default)]
pub struct MockFeedSource {
    outcomes: Mutex<HashMap<String, FeedOutcome>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl MockFeedSource {
    /// Create a new mock feed source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome returned for `area`.
    pub fn set_outcome(&self, area: &str, outcome: FeedOutcome) {
        lock(&self.outcomes).insert(area.to_string(), outcome);
    }

    /// Make reads of `area` fail with a network error.
    pub fn fail_area(&self, area: &str) {
        lock(&self.failing).insert(area.to_string());
    }

    /// Every `(area, not_modified_since)` this source was asked for.
    pub fn calls(&self) -> Vec<(String, DateTime<Utc>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn read_feed(
        &self,
        area: &str,
        not_modified_since: DateTime<Utc>,
    ) -> Result<FeedOutcome, SourceError> {
        lock(&self.calls).push((area.to_string(), not_modified_since));

        if lock(&self.failing).contains(area) {
            return Err(SourceError::Network(format!("mock feed failure for {}", area)));
        }

        Ok(lock(&self.outcomes)
            .get(area)
            .cloned()
            .unwrap_or_else(FeedOutcome::empty))
    }
}

/// A search source that returns predefined papers per area and records the
/// cursors it was queried with.
#[derive(Debug, Default)]
pub struct MockSearchSource {
    papers: Mutex<HashMap<String, Vec<Paper>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Cursor)>>,
}

impl MockSearchSource {
    /// Create a new mock search source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the papers returned for `area`.
    pub fn set_papers(&self, area: &str, papers: Vec<Paper>) {
        lock(&self.papers).insert(area.to_string(), papers);
    }

    /// Make queries for `area` fail with a server error.
    pub fn fail_area(&self, area: &str) {
        lock(&self.failing).insert(area.to_string());
    }

    /// Every `(area, cursor)` this source was queried with.
    pub fn calls(&self) -> Vec<(String, Cursor)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SearchSource for MockSearchSource {
    async fn read_api(
        &self,
        area: &str,
        cursor: &Cursor,
        _filtering: &FilteringConfig,
    ) -> Result<Vec<Paper>, SourceError> {
        lock(&self.calls).push((area.to_string(), cursor.clone()));

        if lock(&self.failing).contains(area) {
            return Err(SourceError::Api {
                status: 503,
                message: format!("mock search failure for {}", area),
            });
        }

        Ok(lock(&self.papers).get(area).cloned().unwrap_or_default())
    }
}

/// Helper function to create a mock paper for testing.
pub fn make_paper(id: &str, title: &str) -> Paper {
    PaperBuilder::new(id, title)
        .authors(["Test Author"])
        .abstract_text(format!("Abstract of {}", title))
        .build()
}
