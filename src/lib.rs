//! Directory-Harvest: a paginated personnel directory harvester
//!
//! This crate crawls a paginated directory one partition at a time, stops each
//! partition when a page repeats, fetches portrait images exactly once into an
//! on-disk cache, and joins every record with externally predicted attributes.

pub mod config;
pub mod crawler;
pub mod enrich;
pub mod fetcher;
pub mod output;
pub mod records;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Directory-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page load failed for partition {partition}: {message}")]
    PageLoad { partition: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Resource exhausted, aborting run: {0}")]
    ResourceExhausted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ResourceExhausted(_) => true,
            Self::Io(e) => is_storage_full(e),
            Self::Storage(e) => e.is_resource_exhaustion(),
            Self::Fetch(e) => e.is_resource_exhaustion(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Resource retrieval errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Reference does not yield a usable filename: {0}")]
    InvalidReference(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Fetch deadline exceeded for {url}")]
    DeadlineExceeded { url: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl FetchError {
    /// Returns true if another attempt may succeed
    ///
    /// Connection failures, timeouts, interrupted bodies, HTTP 5xx, 408 and 429
    /// are transient. Everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Network { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            Self::InvalidReference(_) | Self::DeadlineExceeded { .. } | Self::Io { .. } => false,
        }
    }

    /// Returns true if the local disk cannot take more data
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::Io { source, .. } if is_storage_full(source))
    }
}

/// Prediction service errors
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Prediction service error: {0}")]
    Service(String),

    #[error("Prediction timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to decode prediction: {0}")]
    Decode(String),

    #[error("Prediction service not configured")]
    Disabled,
}

/// Returns true if an IO error means the disk or quota is full
pub fn is_storage_full(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
    )
}

/// Result type alias for Directory-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for resource retrieval
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{DirectoryRecord, EnrichedRecord, FetchedArtifact, Partition};
pub use state::{PartitionStatus, StopReason};
