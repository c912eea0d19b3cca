use crate::records::Partition;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Directory-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    pub output: OutputConfig,
}

/// Directory source and pagination behavior
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Page URL with a `{partition}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// CSS selector for the next-page anchor
    #[serde(rename = "next-selector", default = "default_next_selector")]
    pub next_selector: String,

    /// Time to let the page settle after each pagination action (milliseconds)
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Maximum pages per partition; 0 disables the bound
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Partition labels to crawl, A-Z when omitted
    #[serde(default)]
    pub partitions: Option<Vec<String>>,

    /// Persist records accumulated before a page load failure
    #[serde(rename = "persist-partial", default)]
    pub persist_partial: bool,
}

impl SourceConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn page_limit(&self) -> Option<u32> {
        (self.max_pages > 0).then_some(self.max_pages)
    }

    pub fn partitions(&self) -> Vec<Partition> {
        match &self.partitions {
            Some(labels) => labels.iter().map(Partition::new).collect(),
            None => Partition::alphabet(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Resource fetcher retry and timeout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "min-backoff-ms", default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-request timeout
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Overall deadline for one fetch, covering every attempt and backoff
    #[serde(rename = "deadline-secs", default)]
    pub deadline_secs: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            deadline_secs: None,
        }
    }
}

/// Prediction service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Base URL of the prediction service; predictions are disabled without it
    #[serde(rename = "service-url", default)]
    pub service_url: Option<String>,

    /// Filename fragment marking a "no image available" placeholder
    #[serde(rename = "no-image-sentinel", default = "default_no_image_sentinel")]
    pub no_image_sentinel: String,

    /// Timeout per prediction call (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_prediction_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            no_image_sentinel: default_no_image_sentinel(),
            timeout_ms: default_prediction_timeout_ms(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for partition files and the image cache
    #[serde(rename = "data-dir")]
    pub data_dir: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

impl OutputConfig {
    pub fn partitions_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("json")
    }

    pub fn images_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("images")
    }
}

fn default_next_selector() -> String {
    "a.rgPageNext".to_string()
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_max_pages() -> u32 {
    500
}

fn default_max_attempts() -> u32 {
    5
}

fn default_min_backoff_ms() -> u64 {
    4_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_no_image_sentinel() -> String {
    "NoImageProvided.png".to_string()
}

fn default_prediction_timeout_ms() -> u64 {
    10_000
}
