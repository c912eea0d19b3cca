//! Directory-Harvest main entry point
//!
//! This is the command-line interface for the Directory-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use directory_harvest::config::{load_config_with_hash, Config};
use directory_harvest::crawler::{run_harvest, HarvestMode};
use directory_harvest::HarvestError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Directory-Harvest: a paginated personnel directory harvester
///
/// Directory-Harvest crawls a paginated directory one partition at a time,
/// caches every portrait image once, and assembles an enriched dataset with
/// predicted attributes.
#[derive(Parser, Debug)]
#[command(name = "directory-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paginated personnel directory harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl partitions without assembling the dataset
    #[arg(long, conflicts_with_all = ["assemble_only", "dry_run", "stats"])]
    crawl_only: bool,

    /// Assemble the dataset from previously crawled partitions
    #[arg(long, conflicts_with_all = ["crawl_only", "dry_run", "stats"])]
    assemble_only: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show dataset statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Rewrite the markdown summary of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "crawl_only", "assemble_only"])]
    export_summary: bool,
}

impl Cli {
    fn mode(&self) -> HarvestMode {
        if self.crawl_only {
            HarvestMode::CrawlOnly
        } else if self.assemble_only {
            HarvestMode::AssembleOnly
        } else {
            HarvestMode::Full
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(harvest) = e.downcast_ref::<HarvestError>() {
                if harvest.is_fatal() {
                    eprintln!("error: storage exhausted, run aborted: {}", harvest);
                    eprintln!("free disk space and rerun; cached images are reused");
                    return ExitCode::FAILURE;
                }
            }
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }
    if cli.stats {
        return handle_stats(&config);
    }
    if cli.export_summary {
        return handle_export_summary(&config);
    }

    let summary = run_harvest(&config, &config_hash, cli.mode()).await?;

    let failed = summary.failed_partitions().count();
    if failed > 0 {
        tracing::warn!(
            "{} of {} partitions failed; see {}",
            failed,
            summary.partitions.len(),
            config.output.summary_path
        );
    }
    tracing::info!("Harvest run {} completed", summary.run_id);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("directory_harvest=info,warn"),
            1 => EnvFilter::new("directory_harvest=debug,info"),
            2 => EnvFilter::new("directory_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated config and the partitions
fn handle_dry_run(config: &Config) {
    println!("=== Directory-Harvest Dry Run ===\n");

    println!("Source:");
    println!("  URL template: {}", config.source.url_template);
    println!("  Next-page selector: {}", config.source.next_selector);
    println!("  Settle interval: {}ms", config.source.settle_ms);
    match config.source.page_limit() {
        Some(limit) => println!("  Max pages per partition: {}", limit),
        None => println!("  Max pages per partition: unbounded"),
    }
    println!(
        "  Partial results of failed partitions: {}",
        if config.source.persist_partial {
            "persisted"
        } else {
            "discarded"
        }
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nFetcher:");
    println!("  Max attempts: {}", config.fetcher.max_attempts);
    println!(
        "  Backoff: {}ms .. {}ms",
        config.fetcher.min_backoff_ms, config.fetcher.max_backoff_ms
    );
    if let Some(deadline) = config.fetcher.deadline_secs {
        println!("  Deadline per resource: {}s", deadline);
    }

    println!("\nEnrichment:");
    match &config.enrichment.service_url {
        Some(url) => println!("  Prediction service: {}", url),
        None => println!("  Prediction service: disabled"),
    }
    println!("  No-image sentinel: {}", config.enrichment.no_image_sentinel);

    println!("\nOutput:");
    println!("  Partitions: {}", config.output.partitions_dir().display());
    println!("  Images: {}", config.output.images_dir().display());
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    let partitions = config.source.partitions();
    println!("\nPartitions ({}):", partitions.len());
    for partition in &partitions {
        println!(
            "  - {} -> {}",
            partition,
            config
                .source
                .url_template
                .replace("{partition}", partition.label())
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use directory_harvest::output::{load_statistics, print_statistics};
    use directory_harvest::storage::SqliteStorage;

    println!("Database: {}\n", config.output.database_path);

    let path = Path::new(&config.output.database_path);
    if !path.exists() {
        anyhow::bail!("database {} does not exist; run a harvest first", path.display());
    }

    let storage = SqliteStorage::new(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: regenerates the markdown summary
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    use directory_harvest::output::{generate_markdown_summary, summary_from_log};
    use directory_harvest::storage::SqliteStorage;

    println!("=== Exporting Harvest Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let path = Path::new(&config.output.database_path);
    if !path.exists() {
        anyhow::bail!("database {} does not exist; run a harvest first", path.display());
    }

    let storage = SqliteStorage::new(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let summary = summary_from_log(&storage)?;
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))
        .with_context(|| format!("failed to write {}", config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}
