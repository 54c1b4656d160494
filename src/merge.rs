//! Reconciliation of feed and search API results.

use std::collections::HashSet;

use crate::models::Paper;

/// Merge feed and API papers into one list without duplicate ids.
///
/// API papers come first in their original order and win when both sources
/// report the same id; feed-only papers follow in their original order. An
/// id repeated within one input keeps its first occurrence.
pub fn merge(feed_papers: Vec<Paper>, api_papers: Vec<Paper>) -> Vec<Paper> {
    dedup_by_id(api_papers.into_iter().chain(feed_papers))
}

/// Keep the first paper seen for each id, preserving order
pub fn dedup_by_id<I>(papers: I) -> Vec<Paper>
where
    I: IntoIterator<Item = Paper>,
{
    let mut seen = HashSet::new();
    papers
        .into_iter()
        .filter(|paper| seen.insert(paper.id().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;

    fn paper(id: &str, title: &str) -> Paper {
        PaperBuilder::new(id, title).build()
    }

    fn ids(papers: &[Paper]) -> Vec<&str> {
        papers.iter().map(|p| p.id()).collect()
    }

    #[test]
    fn test_api_first_then_feed_only() {
        let feed = vec![paper("3", "f3"), paper("1", "f1"), paper("4", "f4")];
        let api = vec![paper("1", "a1"), paper("2", "a2")];

        let merged = merge(feed, api);
        assert_eq!(ids(&merged), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_api_record_wins_on_collision() {
        let feed = vec![paper("2501.00001", "from feed")];
        let api = vec![paper("2501.00001", "from api")];

        let merged = merge(feed, api);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title(), "from api");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge(Vec::new(), Vec::new()).is_empty());

        let only_feed = merge(vec![paper("1", "f")], Vec::new());
        assert_eq!(ids(&only_feed), vec!["1"]);

        let only_api = merge(Vec::new(), vec![paper("2", "a")]);
        assert_eq!(ids(&only_api), vec!["2"]);
    }

    #[test]
    fn test_repeated_ids_within_one_source() {
        let feed = vec![paper("1", "f1"), paper("1", "f1 again")];
        let api = vec![paper("2", "a2"), paper("2", "a2 again")];

        let merged = merge(feed, api);
        assert_eq!(ids(&merged), vec!["2", "1"]);
        assert_eq!(merged[0].title(), "a2");
        assert_eq!(merged[1].title(), "f1");
    }
}
