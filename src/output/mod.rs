//! Output module for harvest summaries and reports
//!
//! This module handles:
//! - Building a summary of a harvest run
//! - Rendering the summary as markdown
//! - Loading and printing dataset statistics

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, DatasetStatistics};
pub use summary::HarvestSummary;

use crate::storage::{RunLog, StorageError};

/// Builds the summary of the latest run from the run log
///
/// Assembly statistics are not persisted, so the summary carries the
/// partition outcomes only.
pub fn summary_from_log(log: &dyn RunLog) -> Result<HarvestSummary, StorageError> {
    let run = log
        .get_latest_run()?
        .ok_or_else(|| StorageError::Serialization("No harvest runs found in database".to_string()))?;
    let partitions = log.partition_reports(run.id)?;

    Ok(HarvestSummary {
        run_id: run.id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        partitions,
        assembly: None,
    })
}
