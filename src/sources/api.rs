//! arXiv search API reader.

use async_trait::async_trait;
use chrono::NaiveDate;
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::{ApiConfig, Config, FilteringConfig};
use crate::models::{Cursor, Paper, PaperBuilder};
use crate::sources::{SearchSource, SourceError};
use crate::utils::{text, with_retry, HttpClient, RetryConfig};

/// Width of the author allow-list window, in days
const AUTHOR_WINDOW_DAYS: u32 = 60;

/// One page of search results
struct ResultPage {
    feed: feed_rs::model::Feed,
    /// `opensearch:totalResults`, when the page reports it
    total: Option<usize>,
}

/// arXiv search API reader
///
/// Issues one query per harvest covering the area's recent submissions and
/// allow-listed authors' submissions of the last two months, paging through
/// every result.
#[derive(Debug, Clone)]
pub struct ArxivApiReader {
    client: HttpClient,
    config: ApiConfig,
    retry: RetryConfig,
}

impl ArxivApiReader {
    /// Create an API reader from the application configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new(&config.http)?, config))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            config: config.api.clone(),
            retry: RetryConfig::from(&config.http),
        }
    }

    fn page_url(&self, search_query: &str, start: usize, page_size: usize) -> String {
        format!(
            "{}?search_query={}&start={}&max_results={}&sortBy=submittedDate&sortOrder=ascending",
            self.config.base_url,
            urlencoding::encode(search_query),
            start,
            page_size
        )
    }

    /// Fetch the page at `start`. An empty page short of the reported total
    /// is retried like a server error.
    async fn fetch_page(&self, url: &str, start: usize) -> Result<ResultPage, SourceError> {
        let client = &self.client;

        with_retry(self.retry, || async move {
            let response = client
                .get(url)
                .header("Accept", "application/atom+xml")
                .send()
                .await
                .map_err(|e| {
                    SourceError::Network(format!("Failed to fetch arXiv results: {}", e))
                })?;

            if !response.status().is_success() {
                return Err(SourceError::from_status(response.status(), "arXiv API"));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

            let page = ResultPage {
                total: total_results(bytes.as_ref()),
                feed: parser::parse(bytes.as_ref())?,
            };

            match page.total {
                Some(total) if page.feed.entries.is_empty() && start < total => {
                    Err(SourceError::EmptyPage { start, total })
                }
                _ => Ok(page),
            }
        })
        .await
    }

    /// Parse arXiv Atom feed entry into Paper
    fn parse_entry(entry: &feed_rs::model::Entry) -> Result<Paper, SourceError> {
        let id = text::id_from_abs_url(&entry.id)
            .or_else(|| {
                entry
                    .links
                    .iter()
                    .find_map(|link| text::id_from_abs_url(&link.href))
            })
            .ok_or_else(|| SourceError::Parse(format!("Missing paper ID in {:?}", entry.id)))?;

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.as_str())
            .unwrap_or("");

        let authors = entry.authors.iter().map(|a| a.name.trim());

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| text::unescape_html(&text::collapse_newlines(&s.content)))
            .unwrap_or_default();

        Ok(PaperBuilder::new(id, title)
            .authors(authors)
            .abstract_text(abstract_text.trim())
            .build())
    }
}

#[async_trait]
impl SearchSource for ArxivApiReader {
    async fn read_api(
        &self,
        area: &str,
        cursor: &Cursor,
        filtering: &FilteringConfig,
    ) -> Result<Vec<Paper>, SourceError> {
        let search_query = build_search_query(area, cursor, filtering)?;
        tracing::debug!("arXiv query for {}: {}", area, search_query);

        let page_size = self.config.page_size.max(1);
        let mut papers = Vec::new();
        let mut start = 0;

        loop {
            if start > 0 && !self.config.page_delay().is_zero() {
                tokio::time::sleep(self.config.page_delay()).await;
            }

            let page = self
                .fetch_page(&self.page_url(&search_query, start, page_size), start)
                .await?;
            let fetched = page.feed.entries.len();

            for entry in &page.feed.entries {
                match Self::parse_entry(entry) {
                    Ok(paper) => papers.push(paper),
                    Err(e) if filtering.skip_malformed => {
                        tracing::warn!("Skipping malformed arXiv result for {}: {}", area, e)
                    }
                    Err(e) => return Err(e),
                }
            }
            start += fetched;

            let done = match page.total {
                Some(total) => start >= total,
                None => fetched < page_size,
            };
            if done {
                break;
            }
        }

        tracing::debug!("arXiv API returned {} papers for {}", papers.len(), area);
        Ok(papers)
    }
}

/// Read `opensearch:totalResults` from a result page
fn total_results(xml: &[u8]) -> Option<usize> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_total = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => in_total = e.local_name().as_ref() == b"totalResults",
            Ok(Event::Text(t)) if in_total => {
                return std::str::from_utf8(&t).ok()?.trim().parse().ok();
            }
            Ok(Event::End(_)) => in_total = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Build the combined query
/// `(cat:AREA AND primary window) OR (authors AND author window)`.
///
/// Windows are whole days ending on the cursor's day. The author clause is
/// left out when the allow-list is empty.
pub fn build_search_query(
    area: &str,
    cursor: &Cursor,
    filtering: &FilteringConfig,
) -> Result<String, SourceError> {
    let (start, end) = cursor.window(filtering.duration_days)?;
    let area_clause = format!("(cat:{} AND {})", area, submitted_between(start, end));

    let authors = filtering.authors();
    if authors.is_empty() {
        return Ok(area_clause);
    }

    let author_query = authors
        .iter()
        .map(|author| format!("au:\"{}\"", author))
        .collect::<Vec<_>>()
        .join(" OR ");
    let (author_start, _) = cursor.window(AUTHOR_WINDOW_DAYS)?;

    Ok(format!(
        "{} OR (({}) AND {})",
        area_clause,
        author_query,
        submitted_between(author_start, end)
    ))
}

fn submitted_between(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "submittedDate:[{}0000 TO {}2359]",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cursor() -> Cursor {
        Cursor::new(Utc.with_ymd_and_hms(2025, 1, 6, 5, 0, 0).unwrap(), "2501.00001")
    }

    #[test]
    fn test_build_search_query_area_only() {
        let filtering = FilteringConfig {
            duration_days: 5,
            ..FilteringConfig::default()
        };

        let query = build_search_query("cond-mat.mtrl-sci", &cursor(), &filtering).unwrap();
        assert_eq!(
            query,
            "(cat:cond-mat.mtrl-sci AND submittedDate:[202501010000 TO 202501062359])"
        );
    }

    #[test]
    fn test_build_search_query_with_authors() {
        let filtering = FilteringConfig {
            duration_days: 1,
            author_list: "Jane Doe, John Smith".to_string(),
            ..FilteringConfig::default()
        };

        let query = build_search_query("cs.LG", &cursor(), &filtering).unwrap();
        assert_eq!(
            query,
            "(cat:cs.LG AND submittedDate:[202501050000 TO 202501062359]) OR \
             ((au:\"Jane Doe\" OR au:\"John Smith\") AND submittedDate:[202411070000 TO 202501062359])"
        );
    }

    #[test]
    fn test_build_search_query_rejects_oversized_window() {
        let filtering = FilteringConfig {
            duration_days: u32::MAX,
            ..FilteringConfig::default()
        };

        let result = build_search_query("cs.LG", &cursor(), &filtering);
        assert!(matches!(result, Err(SourceError::InvalidRequest(_))));
    }

    #[test]
    fn test_total_results() {
        let xml = br#"<feed xmlns="http://www.w3.org/2005/Atom"
            xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
            <opensearch:totalResults>250</opensearch:totalResults>
            <opensearch:startIndex>0</opensearch:startIndex>
        </feed>"#;
        assert_eq!(total_results(xml), Some(250));
        assert_eq!(total_results(b"<feed><title>x</title></feed>"), None);
    }

    fn parse(xml: &str) -> Vec<Result<Paper, SourceError>> {
        let feed = parser::parse(xml.as_bytes()).unwrap();
        feed.entries.iter().map(ArxivApiReader::parse_entry).collect()
    }

    #[test]
    fn test_parse_entry_normalizes_result() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
            <title>arXiv Query Results</title>
            <id>http://arxiv.org/api/abc</id>
            <updated>2025-01-06T00:00:00-05:00</updated>
            <entry>
                <id>http://arxiv.org/abs/2501.00002v1</id>
                <updated>2025-01-03T18:00:00Z</updated>
                <published>2025-01-03T18:00:00Z</published>
                <title>Band gaps of layered oxides</title>
                <summary>We compute band gaps
of layered oxides &amp;amp; nitrides.</summary>
                <author><name>Jane Doe</name></author>
                <author><name>John Smith</name></author>
                <link href="http://arxiv.org/abs/2501.00002v1" rel="alternate" type="text/html"/>
            </entry>
        </feed>"#;

        let papers = parse(xml);
        let paper = papers[0].as_ref().unwrap();
        assert_eq!(paper.id(), "2501.00002");
        assert_eq!(paper.title(), "Band gaps of layered oxides");
        assert_eq!(paper.authors(), ["Jane Doe", "John Smith"]);
        assert_eq!(
            paper.abstract_text(),
            "We compute band gaps of layered oxides & nitrides."
        );
    }

    #[test]
    fn test_parse_entry_without_abs_url() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
            <title>arXiv Query Results</title>
            <id>http://arxiv.org/api/abc</id>
            <updated>2025-01-06T00:00:00-05:00</updated>
            <entry>
                <id>http://arxiv.org/api/errors#incorrect_id_format</id>
                <updated>2025-01-06T00:00:00-05:00</updated>
                <title>Error</title>
                <summary>incorrect id format</summary>
            </entry>
        </feed>"#;

        let papers = parse(xml);
        assert!(matches!(papers[0], Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_page_url_encodes_query() {
        let reader = ArxivApiReader::new(&Config::default()).unwrap();
        let url = reader.page_url("(cat:cs.LG AND x)", 100, 100);
        assert!(url.starts_with("http://export.arxiv.org/api/query?search_query=%28cat%3Acs.LG"));
        assert!(url.contains("&start=100&max_results=100"));
        assert!(url.ends_with("&sortBy=submittedDate&sortOrder=ascending"));
    }
}
