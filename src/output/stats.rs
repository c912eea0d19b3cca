//! Statistics from the assembled dataset
//!
//! This module provides functionality for extracting and displaying
//! dataset statistics from the storage layer.

use crate::storage::{RunLog, SqliteStorage, StorageError};

/// Dataset statistics summary
#[derive(Debug, Clone, Default)]
pub struct DatasetStatistics {
    /// Total number of enriched records
    pub total_records: u64,

    /// Records per originating partition
    pub records_by_partition: Vec<(String, u64)>,

    /// Records with an image reference
    pub with_image_ref: u64,

    /// Records with a cached image on disk
    pub with_image_path: u64,

    /// Records with a name-based gender prediction
    pub with_name_gender: u64,

    /// Records with a name-based ethnicity prediction
    pub with_name_ethnicity: u64,

    /// Records with image-based demographics
    pub with_image_demographics: u64,

    /// Partitions that failed in the latest run
    pub failed_partitions: Vec<String>,
}

impl DatasetStatistics {
    /// Share of records with the given count, as a percentage
    pub fn coverage(&self, count: u64) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        (count as f64 / self.total_records as f64) * 100.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(DatasetStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &SqliteStorage) -> Result<DatasetStatistics, StorageError> {
    let failed_partitions = match storage.get_latest_run()? {
        Some(run) => storage
            .partition_reports(run.id)?
            .into_iter()
            .filter(|r| r.status == crate::state::PartitionStatus::Failed)
            .map(|r| r.partition.label().to_string())
            .collect(),
        None => Vec::new(),
    };

    Ok(DatasetStatistics {
        total_records: storage.count_records()?,
        records_by_partition: storage.count_records_by_partition()?,
        with_image_ref: storage.count_present("imageRef")?,
        with_image_path: storage.count_present("imagePath")?,
        with_name_gender: storage.count_present("name_gender")?,
        with_name_ethnicity: storage.count_present("name_ethnicity")?,
        with_image_demographics: storage.count_present("image_gender")?,
        failed_partitions,
    })
}

/// Prints statistics to stdout in a human-readable format
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Total Records: {}", stats.total_records);
    println!();

    if !stats.records_by_partition.is_empty() {
        println!("Records by Partition:");
        for (partition, count) in &stats.records_by_partition {
            println!("  {}: {}", partition, count);
        }
        println!();
    }

    println!("Field Coverage:");
    for (label, count) in [
        ("Image reference", stats.with_image_ref),
        ("Cached image", stats.with_image_path),
        ("Name gender", stats.with_name_gender),
        ("Name ethnicity", stats.with_name_ethnicity),
        ("Image demographics", stats.with_image_demographics),
    ] {
        println!("  {}: {} ({:.1}%)", label, count, stats.coverage(count));
    }
    println!();

    if !stats.failed_partitions.is_empty() {
        println!(
            "Failed Partitions in Latest Run ({}):",
            stats.failed_partitions.len()
        );
        for partition in &stats.failed_partitions {
            println!("  - {}", partition);
        }
        println!();
    }
}
