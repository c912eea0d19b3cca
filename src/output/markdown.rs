//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of harvest runs,
//! including partition outcomes, failures, and dataset assembly counters.

use crate::output::summary::HarvestSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a harvest run
///
/// # Arguments
///
/// * `summary` - The harvest summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(std::io::Error)` - Failed to write summary
pub fn generate_markdown_summary(
    summary: &HarvestSummary,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a harvest summary as markdown
pub fn format_markdown_summary(summary: &HarvestSummary) -> String {
    let mut md = String::new();

    md.push_str("# Directory Harvest Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Partitions
    if !summary.partitions.is_empty() {
        md.push_str("## Partitions\n\n");
        md.push_str(&format!(
            "- **Completed**: {} of {}\n",
            summary.completed_partitions(),
            summary.partitions.len()
        ));
        md.push_str(&format!("- **Pages Visited**: {}\n", summary.total_pages()));
        md.push_str(&format!(
            "- **Records Persisted**: {}\n\n",
            summary.total_records()
        ));

        md.push_str("| Partition | Status | Stop Reason | Pages | Records | Duplicates Dropped |\n");
        md.push_str("|-----------|--------|-------------|-------|---------|--------------------|\n");
        for report in &summary.partitions {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                report.partition,
                report.status,
                report
                    .stop_reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                report.pages_visited,
                report.records_persisted,
                report.duplicates_dropped
            ));
        }
        md.push('\n');
    }

    // Failures
    let failures: Vec<_> = summary.failed_partitions().collect();
    if !failures.is_empty() {
        md.push_str("## Failed Partitions\n\n");
        for report in failures {
            md.push_str(&format!(
                "- **{}**: {}\n",
                report.partition,
                report.error.as_deref().unwrap_or("unknown error")
            ));
        }
        md.push('\n');
    }

    // Assembly
    if let Some(assembly) = &summary.assembly {
        md.push_str("## Dataset Assembly\n\n");
        md.push_str("| Metric | Count |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Partitions Loaded | {} |\n", assembly.partitions_loaded));
        md.push_str(&format!(
            "| Partitions Unreadable | {} |\n",
            assembly.partitions_missing
        ));
        md.push_str(&format!("| Records | {} |\n", assembly.records));
        md.push_str(&format!("| Images Fetched | {} |\n", assembly.images_fetched));
        md.push_str(&format!("| Images From Cache | {} |\n", assembly.images_cached));
        md.push_str(&format!("| Image Fetch Failures | {} |\n", assembly.fetch_failures));
        md.push_str(&format!(
            "| Records Without Image | {} |\n\n",
            assembly.records_without_image
        ));
    }

    md
}
