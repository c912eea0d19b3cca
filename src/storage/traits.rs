//! Storage traits and error types
//!
//! This module defines the sink and source interfaces the crawler and the
//! dataset assembler write to and read from.

use crate::crawler::PartitionReport;
use crate::records::{DirectoryRecord, EnrichedRecord, Partition};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if the disk or database is full
    pub fn is_resource_exhaustion(&self) -> bool {
        match self {
            Self::Io(e) => crate::is_storage_full(e),
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::DiskFull
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::Io(e.into())
        } else {
            Self::Serialization(e.to_string())
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for crawled partitions, one addressable unit per partition
pub trait PartitionSink {
    /// Writes a partition's records, replacing any earlier output for it
    fn write_partition(
        &mut self,
        partition: &Partition,
        records: &[DirectoryRecord],
    ) -> StorageResult<()>;
}

/// Read side of persisted partitions
pub trait PartitionSource {
    /// Partitions that have persisted output, in key order
    fn list_partitions(&self) -> StorageResult<Vec<Partition>>;

    /// Records of one partition, in page-encounter order
    fn read_partition(&self, partition: &Partition) -> StorageResult<Vec<DirectoryRecord>>;
}

/// Destination for the assembled dataset
pub trait DatasetSink {
    /// Replaces the dataset with `records`
    fn write_dataset(&mut self, records: &[EnrichedRecord]) -> StorageResult<()>;
}

/// Bookkeeping of harvest runs
pub trait RunLog {
    /// Creates a new run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the outcome of one partition
    fn record_partition(&mut self, run_id: i64, report: &PartitionReport) -> StorageResult<()>;

    /// Partition outcomes of a run, in partition order
    fn partition_reports(&self, run_id: i64) -> StorageResult<Vec<PartitionReport>>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;
}
