//! The two arXiv sources a harvest reconciles.
//!
//! - [`FeedSource`]: the per-area RSS announcement feed. Fast, but only
//!   carries what was announced in the latest mailing.
//! - [`SearchSource`]: the Atom search API. Richer metadata and a queryable
//!   date window, but lags behind the feed.
//!
//! [`RssFeedReader`] and [`ArxivApiReader`] talk to arXiv over HTTP;
//! [`mock`] provides in-memory stand-ins for tests.

mod api;
mod feed;
pub mod mock;

pub use api::{build_search_query, ArxivApiReader};
pub use feed::RssFeedReader;
pub use mock::{MockFeedSource, MockSearchSource};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::FilteringConfig;
use crate::models::{Cursor, FeedOutcome, Paper};

/// Reads one area's announcement feed.
#[async_trait]
pub trait FeedSource: Send + Sync + std::fmt::Debug {
    /// Fetch the feed for `area` unless it has not changed since
    /// `not_modified_since`.
    ///
    /// Not-modified and empty feeds yield [`FeedOutcome::empty`], which has
    /// no cursor.
    async fn read_feed(
        &self,
        area: &str,
        not_modified_since: DateTime<Utc>,
    ) -> Result<FeedOutcome, SourceError>;
}

/// Queries the search API over the date window bounded by a feed cursor.
#[async_trait]
pub trait SearchSource: Send + Sync + std::fmt::Debug {
    /// Papers in `area` submitted within the primary window, plus papers by
    /// allow-listed authors within the secondary window.
    async fn read_api(
        &self,
        area: &str,
        cursor: &Cursor,
        filtering: &FilteringConfig,
    ) -> Result<Vec<Paper>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the source
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parsing error (XML, dates, malformed entries)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// A result page came back empty before the reported total was reached
    #[error("Empty page at offset {start} of {total} results")]
    EmptyPage { start: usize, total: usize },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SourceError {
    /// Build an error from a non-success status code
    pub fn from_status(status: reqwest::StatusCode, source: &str) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return SourceError::RateLimit;
        }
        SourceError::Api {
            status: status.as_u16(),
            message: format!("{} returned status: {}", source, status),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

impl From<feed_rs::parser::ParseFeedError> for SourceError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        SourceError::Parse(format!("Atom: {}", err))
    }
}

impl From<config::ConfigError> for SourceError {
    fn from(err: config::ConfigError) -> Self {
        SourceError::Config(err.to_string())
    }
}
