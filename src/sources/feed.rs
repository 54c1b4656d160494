//! arXiv RSS announcement feed reader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::IF_MODIFIED_SINCE;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::{Config, FeedConfig, FilteringConfig};
use crate::models::{Cursor, FeedOutcome, Paper, PaperBuilder};
use crate::sources::{FeedSource, SourceError};
use crate::utils::{text, with_retry, HttpClient, RetryConfig};

/// `If-Modified-Since` uses the HTTP date format, always in GMT
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// RSS 2.0 document as published by arXiv
#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "lastBuildDate", default)]
    last_build_date: Option<String>,

    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,

    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

/// One announced paper. Extension elements are matched with or without
/// their namespace prefix.
#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    link: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(rename = "category", default)]
    categories: Vec<String>,

    #[serde(rename = "announce_type", alias = "arxiv:announce_type", default)]
    announce_type: Option<String>,

    #[serde(rename = "creator", alias = "dc:creator", default)]
    creator: Option<String>,
}

impl Item {
    fn id(&self) -> Option<String> {
        self.link.as_deref().and_then(text::id_from_link)
    }

    /// The first category is the primary area
    fn area(&self) -> Option<&str> {
        self.categories
            .first()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    fn raw_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    fn to_paper(&self, id: String) -> Paper {
        let title = text::strip_markup(&text::strip_title_annotation(self.raw_title()));

        let summary = text::strip_markup(self.description.as_deref().unwrap_or(""));
        let summary = text::collapse_newlines(text::strip_announce_preamble(&summary));

        let authors = text::split_authors(self.creator.as_deref().unwrap_or(""));

        PaperBuilder::new(id, title.trim_end())
            .authors(authors)
            .abstract_text(summary.trim())
            .build()
    }
}

/// Reads `{base_url}/{area}` with a conditional GET.
#[derive(Debug, Clone)]
pub struct RssFeedReader {
    client: HttpClient,
    config: FeedConfig,
    filtering: FilteringConfig,
    retry: RetryConfig,
}

impl RssFeedReader {
    /// Create a feed reader from the application configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new(&config.http)?, config))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            config: config.feed.clone(),
            filtering: config.filtering.clone(),
            retry: RetryConfig::from(&config.http),
        }
    }

    fn feed_url(&self, area: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), area)
    }

    /// Fetch the raw document, or `None` when the server answers 304
    async fn fetch(
        &self,
        area: &str,
        not_modified_since: DateTime<Utc>,
    ) -> Result<Option<String>, SourceError> {
        let url = self.feed_url(area);
        let since = not_modified_since.format(HTTP_DATE_FORMAT).to_string();
        tracing::debug!("Fetching {} (if modified since {})", url, since);

        let client = &self.client;
        let url = url.as_str();
        let since = since.as_str();

        with_retry(self.retry, || async move {
            let response = client
                .get(url)
                .header(IF_MODIFIED_SINCE, since)
                .header("Accept", "application/rss+xml")
                .send()
                .await
                .map_err(|e| {
                    SourceError::Network(format!("Failed to fetch arXiv RSS: {}", e))
                })?;

            if response.status() == StatusCode::NOT_MODIFIED {
                return Ok(None);
            }

            if !response.status().is_success() {
                return Err(SourceError::from_status(response.status(), "arXiv RSS"));
            }

            let body = response
                .text()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;
            Ok(Some(body))
        })
        .await
    }
}

#[async_trait]
impl FeedSource for RssFeedReader {
    async fn read_feed(
        &self,
        area: &str,
        not_modified_since: DateTime<Utc>,
    ) -> Result<FeedOutcome, SourceError> {
        match self.fetch(area, not_modified_since).await? {
            Some(body) => parse_feed(&body, area, &self.filtering),
            None => {
                tracing::info!(
                    "No new papers since {} for {}",
                    not_modified_since.format(HTTP_DATE_FORMAT),
                    area
                );
                Ok(FeedOutcome::empty())
            }
        }
    }
}

/// Turn an RSS document into papers and a cursor.
pub(crate) fn parse_feed(
    xml: &str,
    area: &str,
    filtering: &FilteringConfig,
) -> Result<FeedOutcome, SourceError> {
    let document: RssDocument = quick_xml::de::from_str(xml)?;
    let channel = document.channel;

    if channel.items.is_empty() {
        tracing::info!("No entries found for {}", area);
        return Ok(FeedOutcome::empty());
    }

    let timestamp = channel
        .last_build_date
        .as_deref()
        .or(channel.pub_date.as_deref())
        .ok_or_else(|| SourceError::Parse(format!("Feed for {} has no update time", area)))
        .and_then(parse_feed_date)?;

    let mut reference_id = None;
    let mut papers = Vec::with_capacity(channel.items.len());

    for item in &channel.items {
        let Some(id) = item.id() else {
            reject_malformed(filtering, area, "entry without a usable link", item)?;
            continue;
        };

        if reference_id.is_none() {
            reference_id = Some(id.clone());
        }

        let Some(paper_area) = item.area() else {
            reject_malformed(filtering, area, "entry without a category", item)?;
            continue;
        };

        match item.announce_type.as_deref().map(str::trim) {
            Some(ann_type) if filtering.force_new && ann_type != "new" => {
                tracing::debug!("force_new: ignoring {}:{}-{}", ann_type, id, item.raw_title());
                continue;
            }
            None => tracing::trace!("{} carries no announce type", id),
            _ => {}
        }

        if filtering.force_primary && paper_area != area {
            tracing::debug!("in {}, ignoring {}:{}-{}", area, paper_area, id, item.raw_title());
            continue;
        }

        papers.push(item.to_paper(id));
    }

    let Some(reference_id) = reference_id else {
        tracing::info!("No well-formed entries found for {}", area);
        return Ok(FeedOutcome::empty());
    };

    tracing::debug!(
        "Feed for {}: {} of {} entries kept, updated {}",
        area,
        papers.len(),
        channel.items.len(),
        timestamp
    );

    Ok(FeedOutcome::new(papers, Cursor::new(timestamp, reference_id)))
}

fn parse_feed_date(raw: &str) -> Result<DateTime<Utc>, SourceError> {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SourceError::Parse(format!("Invalid feed date {:?}: {}", raw, e)))
}

fn reject_malformed(
    filtering: &FilteringConfig,
    area: &str,
    reason: &str,
    item: &Item,
) -> Result<(), SourceError> {
    if filtering.skip_malformed {
        tracing::warn!("Skipping malformed {} {}: {:?}", area, reason, item.raw_title());
        Ok(())
    } else {
        Err(SourceError::Parse(format!(
            "Malformed {} {}: {:?}",
            area,
            reason,
            item.raw_title()
        )))
    }
}
