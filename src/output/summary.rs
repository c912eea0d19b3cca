//! Harvest summary types

use crate::crawler::PartitionReport;
use crate::enrich::AssemblyStats;
use crate::state::PartitionStatus;

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    // Run metadata
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub config_hash: String,

    /// Outcome of every partition crawled in this run
    pub partitions: Vec<PartitionReport>,

    /// Present when the dataset was assembled in this run
    pub assembly: Option<AssemblyStats>,
}

impl HarvestSummary {
    pub fn completed_partitions(&self) -> usize {
        self.partitions
            .iter()
            .filter(|p| p.status == PartitionStatus::Completed)
            .count()
    }

    pub fn failed_partitions(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions
            .iter()
            .filter(|p| p.status == PartitionStatus::Failed)
    }

    pub fn total_records(&self) -> usize {
        self.partitions.iter().map(|p| p.records_persisted).sum()
    }

    pub fn total_pages(&self) -> u64 {
        self.partitions.iter().map(|p| p.pages_visited as u64).sum()
    }
}
