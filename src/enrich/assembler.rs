//! Dataset assembly - loads partition outputs and builds the final dataset

use crate::enrich::joiner::EnrichmentJoiner;
use crate::fetcher::ResourceFetcher;
use crate::records::{EnrichedRecord, PartitionedRecord};
use crate::storage::{DatasetSink, PartitionSource};
use crate::{HarvestError, Result};

/// Counters collected while assembling the dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub partitions_loaded: usize,
    pub partitions_missing: usize,
    pub records: usize,
    pub images_fetched: usize,
    pub images_cached: usize,
    pub fetch_failures: usize,
    pub records_without_image: usize,
}

/// Drives fetching and enrichment for every persisted record
pub struct DatasetAssembler<'a> {
    fetcher: &'a ResourceFetcher,
    joiner: &'a EnrichmentJoiner,
}

impl<'a> DatasetAssembler<'a> {
    pub fn new(fetcher: &'a ResourceFetcher, joiner: &'a EnrichmentJoiner) -> Self {
        Self { fetcher, joiner }
    }

    /// Reads all partitions, flattens them and tags each record with its partition
    ///
    /// Partitions whose output cannot be read are skipped with a warning.
    pub fn load_records<P: PartitionSource + ?Sized>(
        &self,
        source: &P,
        stats: &mut AssemblyStats,
    ) -> Result<Vec<PartitionedRecord>> {
        let mut records = Vec::new();

        for partition in source.list_partitions()? {
            match source.read_partition(&partition) {
                Ok(rows) => {
                    stats.partitions_loaded += 1;
                    records.extend(rows.into_iter().map(|record| PartitionedRecord {
                        partition: partition.clone(),
                        record,
                    }));
                }
                Err(e) => {
                    stats.partitions_missing += 1;
                    tracing::warn!(partition = %partition, "Skipping unreadable partition: {}", e);
                }
            }
        }

        Ok(records)
    }

    /// Builds the enriched dataset and hands it to `sink`
    ///
    /// A failed image fetch only leaves that record's image fields absent.
    /// Running out of disk aborts the assembly.
    pub async fn assemble<P, D>(&self, source: &P, sink: &mut D) -> Result<AssemblyStats>
    where
        P: PartitionSource + ?Sized,
        D: DatasetSink + ?Sized,
    {
        let mut stats = AssemblyStats::default();
        let entries = self.load_records(source, &mut stats)?;
        tracing::info!(
            records = entries.len(),
            partitions = stats.partitions_loaded,
            "Assembling dataset"
        );

        let mut enriched: Vec<EnrichedRecord> = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let artifact = match entry.record.image_ref.as_deref() {
                Some(reference) => match self.fetcher.fetch(reference).await {
                    Ok(artifact) => {
                        if artifact.cached {
                            stats.images_cached += 1;
                        } else {
                            stats.images_fetched += 1;
                        }
                        Some(artifact)
                    }
                    Err(e) if e.is_resource_exhaustion() => {
                        return Err(HarvestError::ResourceExhausted(e.to_string()));
                    }
                    Err(e) => {
                        stats.fetch_failures += 1;
                        tracing::warn!(
                            name = %entry.record.name,
                            url = reference,
                            "Image fetch failed: {}",
                            e
                        );
                        None
                    }
                },
                None => {
                    stats.records_without_image += 1;
                    None
                }
            };

            enriched.push(self.joiner.join(entry, artifact.as_ref()).await);

            if (index + 1) % 100 == 0 {
                tracing::info!("Progress: {} / {} records enriched", index + 1, entries.len());
            }
        }

        stats.records = enriched.len();

        sink.write_dataset(&enriched).map_err(|e| {
            if e.is_resource_exhaustion() {
                HarvestError::ResourceExhausted(format!("writing dataset: {}", e))
            } else {
                HarvestError::Storage(e)
            }
        })?;

        tracing::info!(
            records = stats.records,
            fetched = stats.images_fetched,
            cached = stats.images_cached,
            failures = stats.fetch_failures,
            "Dataset assembled"
        );

        Ok(stats)
    }
}
