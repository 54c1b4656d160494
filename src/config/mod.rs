//! Configuration management.
//!
//! Every component receives its settings as an explicit value; nothing reads
//! configuration from global state. A configuration file is optional:
//!
//! ```toml
//! [filtering]
//! duration_days = 5
//! author_list = "Jane Doe, John Smith"
//! force_new = true
//! force_primary = true
//! skip_malformed = true
//!
//! [harvest]
//! areas = ["cond-mat.mtrl-sci", "physics.chem-ph"]
//! not_modified_window_hours = 24
//!
//! [api]
//! page_size = 100
//! page_delay_ms = 3000
//! ```
//!
//! Environment variables prefixed with `ARXIV_HARVEST__` override file values,
//! e.g. `ARXIV_HARVEST__FILTERING__DURATION_DAYS=3`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::SourceError;

/// File name looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "arxiv-harvest.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which entries and authors to keep
    #[serde(default)]
    pub filtering: FilteringConfig,

    /// Diagnostic output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Areas to harvest and feed cutoff
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// RSS feed endpoint
    #[serde(default)]
    pub feed: FeedConfig,

    /// Search API endpoint and paging
    #[serde(default)]
    pub api: ApiConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Configuration pointing both sources at a mock server, with no paging
    /// delay and no retries.
    pub fn for_testing(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            feed: FeedConfig {
                base_url: format!("{}/rss", base_url),
            },
            api: ApiConfig {
                base_url: format!("{}/api/query", base_url),
                page_size: default_page_size(),
                page_delay_ms: 0,
            },
            http: HttpConfig {
                max_attempts: 1,
                ..HttpConfig::default()
            },
            ..Self::default()
        }
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Entry filtering and author allow-list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteringConfig {
    /// Width of the primary API window in days
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,

    /// Comma-separated author allow-list for the secondary API window
    #[serde(default)]
    pub author_list: String,

    /// Discard feed entries whose announcement type is not "new"
    #[serde(default = "default_true")]
    pub force_new: bool,

    /// Discard feed entries whose primary area is not the requested area
    #[serde(default = "default_true")]
    pub force_primary: bool,

    /// Skip malformed entries with a warning instead of failing the read
    #[serde(default = "default_true")]
    pub skip_malformed: bool,
}

impl FilteringConfig {
    /// Author names from the allow-list, trimmed, empty names dropped
    pub fn authors(&self) -> Vec<&str> {
        self.author_list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            duration_days: default_duration_days(),
            author_list: String::new(),
            force_new: true,
            force_primary: true,
            skip_malformed: true,
        }
    }
}

fn default_duration_days() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Diagnostic output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Raise the driver's log level to debug
    #[serde(default)]
    pub debug_messages: bool,
}

/// Harvest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Areas harvested when none are given on the command line
    #[serde(default)]
    pub areas: Vec<String>,

    /// The feed is requested as "not modified since now minus this many hours"
    #[serde(default = "default_not_modified_window_hours")]
    pub not_modified_window_hours: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            areas: Vec::new(),
            not_modified_window_hours: default_not_modified_window_hours(),
        }
    }
}

fn default_not_modified_window_hours() -> u32 {
    24
}

/// RSS feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL; the area code is appended as the last path segment
    #[serde(default = "default_feed_url")]
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_url(),
        }
    }
}

fn default_feed_url() -> String {
    "https://rss.arxiv.org/rss".to_string()
}

/// Search API endpoint and paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Results requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause between consecutive page requests
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

impl ApiConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

fn default_api_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_page_delay_ms() -> u64 {
    3000
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    3
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, SourceError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("ARXIV_HARVEST")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Look for a configuration file in the working directory, then in the
/// user's config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("arxiv-harvest").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Get the default configuration
pub fn get_config() -> Config {
    Config::default()
}
