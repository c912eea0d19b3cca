//! Partition orchestrator - runs the page crawler over the partition key space
//!
//! Partitions are crawled sequentially. Each partition's output is written to
//! its own sink unit as soon as the partition finishes. A failing partition is
//! logged and reported, and the run moves on to the next one; only resource
//! exhaustion stops the run.

use crate::crawler::extractor::RecordExtractor;
use crate::crawler::page_crawler::{distinct_by_name, CrawlOutcome, PageCrawler, PartitionFailure};
use crate::crawler::source::PageSource;
use crate::records::Partition;
use crate::state::{PartitionStatus, StopReason};
use crate::storage::{PartitionSink, RunLog};
use crate::{HarvestError, Result};

/// Outcome of one partition within an orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub partition: Partition,
    pub status: PartitionStatus,
    pub stop_reason: Option<StopReason>,
    pub pages_visited: u32,
    pub records_persisted: usize,
    pub duplicates_dropped: usize,
    pub error: Option<String>,
}

impl PartitionReport {
    fn failed(partition: Partition, pages_visited: u32, error: String) -> Self {
        Self {
            partition,
            status: PartitionStatus::Failed,
            stop_reason: None,
            pages_visited,
            records_persisted: 0,
            duplicates_dropped: 0,
            error: Some(error),
        }
    }
}

/// Crawls partitions one after another and persists each independently
pub struct PartitionOrchestrator<'a, E: RecordExtractor + ?Sized, K: PartitionSink + ?Sized> {
    crawler: PageCrawler<'a, E>,
    sink: &'a mut K,
    persist_partial: bool,
    run_log: Option<(&'a mut dyn RunLog, i64)>,
}

impl<'a, E, K> PartitionOrchestrator<'a, E, K>
where
    E: RecordExtractor + ?Sized,
    K: PartitionSink + ?Sized,
{
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `crawler` - The page crawler used for every partition
    /// * `sink` - Where partition outputs are written
    /// * `persist_partial` - Whether records gathered before a page load
    ///   failure are written (true) or discarded (false)
    pub fn new(crawler: PageCrawler<'a, E>, sink: &'a mut K, persist_partial: bool) -> Self {
        Self {
            crawler,
            sink,
            persist_partial,
            run_log: None,
        }
    }

    /// Records each partition's report under `run_id` as soon as it finishes
    pub fn with_run_log(mut self, run_log: &'a mut dyn RunLog, run_id: i64) -> Self {
        self.run_log = Some((run_log, run_id));
        self
    }

    /// Runs every partition, then releases the page source
    ///
    /// The source is closed on every exit path, including a fatal error.
    pub async fn run<S: PageSource + ?Sized>(
        &mut self,
        source: &mut S,
        partitions: &[Partition],
    ) -> Result<Vec<PartitionReport>> {
        let result = self.run_partitions(source, partitions).await;

        if let Err(e) = source.close().await {
            tracing::warn!("Failed to release page source: {}", e);
        }

        result
    }

    async fn run_partitions<S: PageSource + ?Sized>(
        &mut self,
        source: &mut S,
        partitions: &[Partition],
    ) -> Result<Vec<PartitionReport>> {
        let mut reports = Vec::with_capacity(partitions.len());

        for partition in partitions {
            tracing::info!(partition = %partition, "Crawling partition");

            let report = match self.crawler.crawl(source, partition).await {
                Ok(outcome) => self.persist_outcome(outcome)?,
                Err(failure) => self.handle_failure(failure)?,
            };

            if let Some((log, run_id)) = self.run_log.as_mut() {
                log.record_partition(*run_id, &report)?;
            }
            reports.push(report);
        }

        let failed = reports
            .iter()
            .filter(|r| r.status == PartitionStatus::Failed)
            .count();
        tracing::info!(
            partitions = reports.len(),
            failed,
            "Orchestration run finished"
        );

        Ok(reports)
    }

    fn persist_outcome(&mut self, outcome: CrawlOutcome) -> Result<PartitionReport> {
        let partition = outcome.partition.clone();
        let stop_reason = outcome.stop_reason;
        let pages_visited = outcome.pages_visited;
        let (records, duplicates_dropped) = outcome.into_partition_output();

        if duplicates_dropped > 0 {
            tracing::debug!(
                partition = %partition,
                duplicates_dropped,
                "Dropped repeated names from partition output"
            );
        }

        match self.sink.write_partition(&partition, &records) {
            Ok(()) => Ok(PartitionReport {
                partition,
                status: PartitionStatus::Completed,
                stop_reason: Some(stop_reason),
                pages_visited,
                records_persisted: records.len(),
                duplicates_dropped,
                error: None,
            }),
            Err(e) if e.is_resource_exhaustion() => Err(HarvestError::ResourceExhausted(format!(
                "writing partition {}: {}",
                partition, e
            ))),
            Err(e) => {
                tracing::error!(partition = %partition, "Failed to persist partition: {}", e);
                Ok(PartitionReport::failed(partition, pages_visited, e.to_string()))
            }
        }
    }

    fn handle_failure(&mut self, failure: PartitionFailure) -> Result<PartitionReport> {
        let PartitionFailure {
            partition,
            error,
            partial,
            pages_visited,
        } = failure;

        if error.is_fatal() {
            return Err(error);
        }

        tracing::error!(
            partition = %partition,
            pages = pages_visited,
            "Partition crawl failed: {}",
            error
        );

        let mut report = PartitionReport::failed(partition, pages_visited, error.to_string());

        if partial.is_empty() {
            return Ok(report);
        }

        if !self.persist_partial {
            tracing::warn!(
                partition = %report.partition,
                records = partial.len(),
                "Discarding partial records of failed partition"
            );
            return Ok(report);
        }

        let (records, duplicates_dropped) = distinct_by_name(partial);
        match self.sink.write_partition(&report.partition, &records) {
            Ok(()) => {
                tracing::warn!(
                    partition = %report.partition,
                    records = records.len(),
                    "Persisted partial records of failed partition"
                );
                report.records_persisted = records.len();
                report.duplicates_dropped = duplicates_dropped;
            }
            Err(e) if e.is_resource_exhaustion() => {
                return Err(HarvestError::ResourceExhausted(format!(
                    "writing partition {}: {}",
                    report.partition, e
                )));
            }
            Err(e) => {
                tracing::error!(
                    partition = %report.partition,
                    "Failed to persist partial records: {}",
                    e
                );
            }
        }

        Ok(report)
    }
}
