//! Per-area harvest: feed read, cursor-bounded API read, merge.

use chrono::{DateTime, Duration, Utc};

use crate::config::{Config, FilteringConfig};
use crate::merge::{dedup_by_id, merge};
use crate::models::Paper;
use crate::sources::{ArxivApiReader, FeedSource, RssFeedReader, SearchSource, SourceError};

/// Runs the feed and search sources for one area at a time.
#[derive(Debug)]
pub struct Harvester<F, S> {
    feed: F,
    search: S,
    filtering: FilteringConfig,
    not_modified_window: Duration,
}

impl Harvester<RssFeedReader, ArxivApiReader> {
    /// Harvester talking to arXiv over HTTP
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self::new(
            RssFeedReader::new(config)?,
            ArxivApiReader::new(config)?,
            config,
        ))
    }
}

impl<F: FeedSource, S: SearchSource> Harvester<F, S> {
    pub fn new(feed: F, search: S, config: &Config) -> Self {
        Self {
            feed,
            search,
            filtering: config.filtering.clone(),
            not_modified_window: Duration::hours(i64::from(
                config.harvest.not_modified_window_hours,
            )),
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    /// Collect the newly announced papers of `area`.
    pub async fn collect(&self, area: &str) -> Result<Vec<Paper>, SourceError> {
        self.collect_at(area, Utc::now()).await
    }

    /// Like [`collect`](Self::collect) with an explicit current time.
    ///
    /// The API is only queried when the feed produced a cursor; a
    /// not-modified or empty feed yields an empty list.
    pub async fn collect_at(
        &self,
        area: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Paper>, SourceError> {
        let since = now - self.not_modified_window;
        let outcome = self.feed.read_feed(area, since).await?;

        let Some(cursor) = outcome.cursor else {
            tracing::debug!("No cursor for {}, skipping the API step", area);
            return Ok(Vec::new());
        };
        tracing::debug!("Cursor for {}: {} ({})", area, cursor.timestamp, cursor.reference_id);

        let feed_count = outcome.papers.len();
        let api_papers = self.search.read_api(area, &cursor, &self.filtering).await?;
        let api_count = api_papers.len();

        let merged = merge(outcome.papers, api_papers);
        tracing::info!(
            area,
            feed = feed_count,
            api = api_count,
            merged = merged.len(),
            "Harvested {}",
            area
        );
        Ok(merged)
    }

    /// Collect each area in turn. A failing area is recorded and does not
    /// stop the others.
    pub async fn collect_all<A: AsRef<str>>(&self, areas: &[A]) -> HarvestReport {
        let now = Utc::now();
        let mut report = HarvestReport::default();

        for area in areas {
            let area = area.as_ref();
            let result = self.collect_at(area, now).await;
            if let Err(e) = &result {
                tracing::warn!("Harvest of {} failed: {}", area, e);
            }
            report.areas.push(AreaHarvest {
                area: area.to_string(),
                result,
            });
        }

        report
    }
}

/// Outcome of one area's collection
#[derive(Debug)]
pub struct AreaHarvest {
    pub area: String,
    pub result: Result<Vec<Paper>, SourceError>,
}

/// Results of [`Harvester::collect_all`] in area order
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub areas: Vec<AreaHarvest>,
}

impl HarvestReport {
    /// Papers of all successful areas, each id once (first area wins)
    pub fn papers(&self) -> Vec<Paper> {
        dedup_by_id(
            self.areas
                .iter()
                .filter_map(|harvest| harvest.result.as_ref().ok())
                .flatten()
                .cloned(),
        )
    }

    /// Areas whose collection failed
    pub fn failures(&self) -> impl Iterator<Item = (&str, &SourceError)> {
        self.areas.iter().filter_map(|harvest| match &harvest.result {
            Ok(_) => None,
            Err(e) => Some((harvest.area.as_str(), e)),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}
