//! Paper model representing an announced arXiv paper.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Base URL for arXiv abstract pages
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

/// A paper announced on arXiv, as seen by either the RSS feed or the search API.
///
/// Identity is the arXiv id alone: two papers with the same id compare equal
/// and hash the same even if their titles, authors or abstracts differ. This
/// is what lets feed and API records of one paper be reconciled.
///
/// Fields are private so a paper cannot change after it is built; use
/// [`PaperBuilder`] to construct one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Canonical arXiv id without version suffix
    id: String,

    /// Paper title
    title: String,

    /// Authors in listed order
    authors: Vec<String>,

    /// Abstract text
    #[serde(rename = "abstract")]
    abstract_text: String,
}

impl Paper {
    /// Create a new paper with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            abstract_text: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    /// Abstract page URL derived from the id
    pub fn url(&self) -> String {
        format!("{}/{}", ARXIV_ABS_URL, self.id)
    }

    /// PDF URL derived from the id
    pub fn pdf_url(&self) -> String {
        format!("{}/{}", ARXIV_PDF_URL, self.id)
    }
}

impl PartialEq for Paper {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Paper {}

impl Hash for Paper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.title)
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            paper: Paper::new(id, title),
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paper.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.paper.abstract_text = abstract_text.into();
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paper_builder() {
        let paper = PaperBuilder::new("2501.00001", "Test Paper")
            .authors(["Jane Doe", "John Smith"])
            .abstract_text("This is a test abstract.")
            .build();

        assert_eq!(paper.id(), "2501.00001");
        assert_eq!(paper.title(), "Test Paper");
        assert_eq!(paper.authors(), ["Jane Doe", "John Smith"]);
        assert_eq!(paper.abstract_text(), "This is a test abstract.");
    }

    #[test]
    fn test_identity_is_id_only() {
        let from_feed = PaperBuilder::new("2501.00001", "Title (feed)")
            .authors(["A"])
            .build();
        let from_api = PaperBuilder::new("2501.00001", "Title (api)")
            .authors(["A", "B"])
            .abstract_text("longer")
            .build();

        assert_eq!(from_feed, from_api);

        let set: HashSet<Paper> = [from_feed, from_api].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_different_ids_are_distinct() {
        let a = Paper::new("2501.00001", "Same title");
        let b = Paper::new("2501.00002", "Same title");
        assert_ne!(a, b);
    }

    #[test]
    fn test_urls() {
        let paper = Paper::new("2501.00001", "Test");
        assert_eq!(paper.url(), "https://arxiv.org/abs/2501.00001");
        assert_eq!(paper.pdf_url(), "https://arxiv.org/pdf/2501.00001");
    }

    #[test]
    fn test_serialize_uses_abstract_key() {
        let paper = PaperBuilder::new("2501.00001", "Test")
            .abstract_text("Body")
            .build();
        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["abstract"], "Body");
        assert_eq!(json["id"], "2501.00001");
    }
}
