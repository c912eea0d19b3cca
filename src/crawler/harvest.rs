//! Harvest run wiring
//!
//! A harvest run crawls every configured partition into the partition store,
//! then assembles the enriched dataset from whatever the store holds. Either
//! phase can run on its own. Every run is recorded in the run log and ends
//! with a markdown summary.

use crate::config::Config;
use crate::crawler::extractor::HtmlTableExtractor;
use crate::crawler::orchestrator::{PartitionOrchestrator, PartitionReport};
use crate::crawler::page_crawler::PageCrawler;
use crate::crawler::source::{build_http_client, HttpPageSource};
use crate::enrich::{
    AssemblyStats, DatasetAssembler, DisabledPredictor, EnrichmentJoiner, HttpPredictionClient,
};
use crate::fetcher::{ResourceFetcher, RetryPolicy};
use crate::output::{generate_markdown_summary, HarvestSummary};
use crate::storage::{JsonLinesStore, RunLog, RunStatus, SqliteStorage};
use crate::Result;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Which phases of a harvest run are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarvestMode {
    /// Crawl partitions, then assemble the dataset
    #[default]
    Full,

    /// Crawl partitions only
    CrawlOnly,

    /// Assemble the dataset from previously persisted partitions
    AssembleOnly,
}

impl HarvestMode {
    pub fn crawls(&self) -> bool {
        matches!(self, Self::Full | Self::CrawlOnly)
    }

    pub fn assembles(&self) -> bool {
        matches!(self, Self::Full | Self::AssembleOnly)
    }
}

/// Runs a harvest and writes its summary
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `mode` - Which phases to execute
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - The run finished; individual partitions or
///   records may still have failed
/// * `Err(HarvestError)` - The run was aborted
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    mode: HarvestMode,
) -> Result<HarvestSummary> {
    let database_path = Path::new(&config.output.database_path);
    ensure_parent_dir(database_path)?;
    let mut storage = SqliteStorage::new(database_path)?;

    let run_id = storage.create_run(config_hash)?;
    tracing::info!(run_id, ?mode, "Starting harvest run");

    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.fetcher.timeout_secs),
    )?;

    let outcome = execute(config, &client, &mut storage, run_id, mode).await;

    let status = if outcome.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Aborted
    };
    storage.finish_run(run_id, status)?;

    let (partitions, assembly) = match outcome {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(run_id, "Harvest run aborted: {}", e);
            return Err(e);
        }
    };

    let run = storage.get_run(run_id)?;
    let summary = HarvestSummary {
        run_id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        partitions,
        assembly,
    };

    let summary_path = Path::new(&config.output.summary_path);
    ensure_parent_dir(summary_path)?;
    generate_markdown_summary(&summary, summary_path)?;
    tracing::info!("Summary written to {}", summary_path.display());

    Ok(summary)
}

async fn execute(
    config: &Config,
    client: &Client,
    storage: &mut SqliteStorage,
    run_id: i64,
    mode: HarvestMode,
) -> Result<(Vec<PartitionReport>, Option<AssemblyStats>)> {
    let mut partitions = Vec::new();
    if mode.crawls() {
        partitions = crawl_partitions(config, client.clone(), storage, run_id).await?;
    }

    let assembly = if mode.assembles() {
        Some(assemble_dataset(config, client.clone(), storage).await?)
    } else {
        None
    };

    Ok((partitions, assembly))
}

/// Crawls every configured partition into the partition store
///
/// Each partition's report is written to `run_log` as soon as it finishes, so
/// an aborted run still shows the partitions it got through.
pub async fn crawl_partitions(
    config: &Config,
    client: Client,
    run_log: &mut dyn RunLog,
    run_id: i64,
) -> Result<Vec<PartitionReport>> {
    let partitions = config.source.partitions();
    tracing::info!(partitions = partitions.len(), "Crawl phase starting");

    let mut sink = JsonLinesStore::new(config.output.partitions_dir())?;
    let mut source = HttpPageSource::new(client, &config.source)?;
    let extractor = HtmlTableExtractor::new()?;
    let crawler = PageCrawler::new(
        &extractor,
        config.source.settle_interval(),
        config.source.page_limit(),
    );

    let mut orchestrator =
        PartitionOrchestrator::new(crawler, &mut sink, config.source.persist_partial)
            .with_run_log(run_log, run_id);
    let reports = orchestrator.run(&mut source, &partitions).await?;
    Ok(reports)
}

/// Fetches images, runs predictions and writes the dataset into `storage`
pub async fn assemble_dataset(
    config: &Config,
    client: Client,
    storage: &mut SqliteStorage,
) -> Result<AssemblyStats> {
    tracing::info!("Assembly phase starting");

    let partitions = JsonLinesStore::new(config.output.partitions_dir())?;
    let fetcher = ResourceFetcher::new(
        client.clone(),
        config.output.images_dir(),
        RetryPolicy::from_config(&config.fetcher),
    )?
    .with_deadline(config.fetcher.deadline_secs.map(Duration::from_secs));
    let joiner = build_joiner(config, client);

    let assembler = DatasetAssembler::new(&fetcher, &joiner);
    let stats = assembler.assemble(&partitions, storage).await?;
    Ok(stats)
}

/// Builds the enrichment joiner, with predictions disabled when no service is configured
pub fn build_joiner(config: &Config, client: Client) -> EnrichmentJoiner {
    let enrichment = &config.enrichment;
    let timeout = Duration::from_millis(enrichment.timeout_ms);

    match enrichment.service_url.as_deref() {
        Some(url) => {
            tracing::info!(url, "Using prediction service");
            let service = Arc::new(HttpPredictionClient::new(client, url, timeout));
            EnrichmentJoiner::new(
                service.clone(),
                service.clone(),
                service,
                enrichment.no_image_sentinel.clone(),
                timeout,
            )
        }
        None => {
            tracing::warn!("No prediction service configured; predicted fields will be empty");
            let disabled = Arc::new(DisabledPredictor);
            EnrichmentJoiner::new(
                disabled.clone(),
                disabled.clone(),
                disabled,
                enrichment.no_image_sentinel.clone(),
                timeout,
            )
        }
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
