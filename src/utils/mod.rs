//! Utility modules supporting the readers.
//!
//! - [`HttpClient`]: shared reqwest client built from the HTTP settings
//! - [`RetryConfig`] / [`with_retry`]: exponential backoff for transient errors
//! - [`text`]: HTML unescaping, markup stripping and arXiv id handling
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use arxiv_harvest::sources::SourceError;
//! use arxiv_harvest::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default();
//! let result = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;
pub mod text;

pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig, TransientError};
