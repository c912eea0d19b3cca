//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Directory-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Per-partition outcome of each run
CREATE TABLE IF NOT EXISTS partition_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    partition_label TEXT NOT NULL,
    status TEXT NOT NULL,
    stop_reason TEXT,
    pages_visited INTEGER NOT NULL DEFAULT 0,
    records_persisted INTEGER NOT NULL DEFAULT 0,
    duplicates_dropped INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    recorded_at TEXT NOT NULL,
    UNIQUE(run_id, partition_label)
);

CREATE INDEX IF NOT EXISTS idx_partition_runs_run ON partition_runs(run_id);

-- The assembled dataset, one row per enriched record
CREATE TABLE IF NOT EXISTS enriched_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    "imageRef" TEXT,
    college TEXT,
    department TEXT,
    rank TEXT,
    phone TEXT,
    email TEXT,
    "directoryPartition" TEXT NOT NULL,
    "imagePath" TEXT,
    name_gender TEXT,
    name_ethnicity TEXT,
    image_age INTEGER,
    image_gender TEXT,
    image_ethnicity TEXT
);

CREATE INDEX IF NOT EXISTS idx_enriched_partition ON enriched_records("directoryPartition");
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
