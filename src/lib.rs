//! # arxiv-harvest
//!
//! Collects newly announced arXiv papers per subject area by reconciling the
//! RSS announcement feed with the search API.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, Cursor, FeedOutcome)
//! - [`sources`]: The RSS feed and search API readers behind the
//!   [`FeedSource`] and [`SearchSource`] traits
//! - [`merge`]: Deduplicating merge of feed and API results
//! - [`harvest`]: Per-area orchestration
//! - [`utils`]: HTTP client, retry, and text normalization
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use arxiv_harvest::{config::Config, Harvester};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let harvester = Harvester::from_config(&config)?;
//! for paper in harvester.collect("cond-mat.mtrl-sci").await? {
//!     println!("{}", paper);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod harvest;
pub mod merge;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use harvest::{HarvestReport, Harvester};
pub use merge::merge;
pub use models::{Cursor, Paper};
pub use sources::{FeedSource, SearchSource, SourceError};
