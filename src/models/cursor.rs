//! Announcement cursor handed from the feed reader to the search-API reader.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Paper;
use crate::sources::SourceError;

/// The feed's last-updated time plus the id of its newest entry.
///
/// A cursor only lives for one harvest pass; it bounds the date window of
/// the API query that follows the feed read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub timestamp: DateTime<Utc>,
    pub reference_id: String,
}

impl Cursor {
    pub fn new(timestamp: DateTime<Utc>, reference_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            reference_id: reference_id.into(),
        }
    }

    /// Inclusive day range `[timestamp - days, timestamp]`
    ///
    /// A window reaching before the earliest representable date is an
    /// [`SourceError::InvalidRequest`].
    pub fn window(&self, days: u32) -> Result<(NaiveDate, NaiveDate), SourceError> {
        let start = self
            .timestamp
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                SourceError::InvalidRequest(format!(
                    "A {} day window before {} is out of range",
                    days, self.timestamp
                ))
            })?;
        Ok((start.date_naive(), self.timestamp.date_naive()))
    }
}

/// What a feed read produced.
///
/// `cursor` is `None` when the feed was not modified or had no entries; in
/// that case there is nothing to bound an API query with.
#[derive(Debug, Clone, Default)]
pub struct FeedOutcome {
    pub papers: Vec<Paper>,
    pub cursor: Option<Cursor>,
}

impl FeedOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(papers: Vec<Paper>, cursor: Cursor) -> Self {
        Self {
            papers,
            cursor: Some(cursor),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty() && self.cursor.is_none()
    }
}
