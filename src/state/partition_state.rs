/// Partition state definitions for tracking crawl progress
use std::fmt;

/// Represents the current state of a partition in the orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionStatus {
    /// Partition crawled and its output persisted
    Completed,

    /// Page loading failed; partial records persisted per policy
    Failed,
}

impl PartitionStatus {
    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Why pagination of a partition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The page produced no records at all
    EmptyPage,

    /// Every record on the page had a name already seen in this partition
    RepeatedPage,

    /// The source reported no next-page control
    NoNextPage,

    /// The configured page bound was reached
    PageLimit,
}

impl StopReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::EmptyPage => "empty_page",
            Self::RepeatedPage => "repeated_page",
            Self::NoNextPage => "no_next_page",
            Self::PageLimit => "page_limit",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "empty_page" => Some(Self::EmptyPage),
            "repeated_page" => Some(Self::RepeatedPage),
            "no_next_page" => Some(Self::NoNextPage),
            "page_limit" => Some(Self::PageLimit),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
