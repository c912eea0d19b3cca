//! Storage module for persisting harvest data
//!
//! This module handles:
//! - Per-partition JSON-lines files written by the crawler
//! - SQLite dataset table written by the assembler
//! - Run and partition outcome tracking

mod jsonl;
mod schema;
mod sqlite;
mod traits;

pub use jsonl::JsonLinesStore;
pub use sqlite::SqliteStorage;
pub use traits::{
    DatasetSink, PartitionSink, PartitionSource, RunLog, StorageError, StorageResult,
};

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}
