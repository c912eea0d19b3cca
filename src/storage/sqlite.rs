//! SQLite storage implementation
//!
//! This module provides the SQLite-backed run log and dataset sink.

use crate::crawler::PartitionReport;
use crate::records::{DirectoryRecord, EnrichedRecord, Partition};
use crate::state::{PartitionStatus, StopReason};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DatasetSink, RunLog, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Dataset Queries =====

    /// Total rows in the dataset
    pub fn count_records(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM enriched_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Dataset rows per originating partition, in partition order
    pub fn count_records_by_partition(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT \"directoryPartition\", COUNT(*) FROM enriched_records
             GROUP BY \"directoryPartition\" ORDER BY \"directoryPartition\"",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows where the given column is present
    ///
    /// `column` must be one of the dataset's own column names.
    pub fn count_present(&self, column: &str) -> StorageResult<u64> {
        const COLUMNS: &[&str] = &[
            "imageRef",
            "imagePath",
            "name_gender",
            "name_ethnicity",
            "image_age",
            "image_gender",
            "image_ethnicity",
        ];
        if !COLUMNS.contains(&column) {
            return Err(StorageError::Serialization(format!(
                "unknown dataset column '{}'",
                column
            )));
        }

        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM enriched_records WHERE \"{}\" IS NOT NULL",
                column
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Reads the dataset back in insertion order
    pub fn load_dataset(&self) -> StorageResult<Vec<EnrichedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, \"imageRef\", college, department, rank, phone, email,
             \"directoryPartition\", \"imagePath\", name_gender, name_ethnicity,
             image_age, image_gender, image_ethnicity
             FROM enriched_records ORDER BY id",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(EnrichedRecord {
                    record: DirectoryRecord {
                        name: row.get(0)?,
                        image_ref: row.get(1)?,
                        college: row.get(2)?,
                        department: row.get(3)?,
                        rank: row.get(4)?,
                        phone: row.get(5)?,
                        email: row.get(6)?,
                    },
                    directory_partition: row.get(7)?,
                    image_path: row.get(8)?,
                    name_gender: row.get(9)?,
                    name_ethnicity: row.get(10)?,
                    image_age: row.get(11)?,
                    image_gender: row.get(12)?,
                    image_ethnicity: row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

impl RunLog for SqliteStorage {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn record_partition(&mut self, run_id: i64, report: &PartitionReport) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO partition_runs
             (run_id, partition_label, status, stop_reason, pages_visited, records_persisted,
              duplicates_dropped, error_message, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                report.partition.label(),
                report.status.to_db_string(),
                report.stop_reason.map(|r| r.to_db_string()),
                report.pages_visited,
                report.records_persisted as i64,
                report.duplicates_dropped as i64,
                report.error,
                now,
            ],
        )?;
        Ok(())
    }

    fn partition_reports(&self, run_id: i64) -> StorageResult<Vec<PartitionReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT partition_label, status, stop_reason, pages_visited, records_persisted,
             duplicates_dropped, error_message
             FROM partition_runs WHERE run_id = ?1 ORDER BY partition_label",
        )?;

        let reports = stmt
            .query_map(params![run_id], |row| {
                Ok(PartitionReport {
                    partition: Partition::new(row.get::<_, String>(0)?),
                    status: PartitionStatus::from_db_string(&row.get::<_, String>(1)?)
                        .unwrap_or(PartitionStatus::Failed),
                    stop_reason: row
                        .get::<_, Option<String>>(2)?
                        .as_deref()
                        .and_then(StopReason::from_db_string),
                    pages_visited: row.get(3)?,
                    records_persisted: row.get::<_, i64>(4)? as usize,
                    duplicates_dropped: row.get::<_, i64>(5)? as usize,
                    error: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reports)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}

impl DatasetSink for SqliteStorage {
    fn write_dataset(&mut self, records: &[EnrichedRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM enriched_records", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO enriched_records
                 (name, \"imageRef\", college, department, rank, phone, email,
                  \"directoryPartition\", \"imagePath\", name_gender, name_ethnicity,
                  image_age, image_gender, image_ethnicity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for enriched in records {
                let record = &enriched.record;
                stmt.execute(params![
                    record.name,
                    record.image_ref,
                    record.college,
                    record.department,
                    record.rank,
                    record.phone,
                    record.email,
                    enriched.directory_partition,
                    enriched.image_path,
                    enriched.name_gender,
                    enriched.name_ethnicity,
                    enriched.image_age,
                    enriched.image_gender,
                    enriched.image_ethnicity,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(records = records.len(), "Dataset written");
        Ok(())
    }
}
