//! Crawler module for paginated directory harvesting
//!
//! This module contains the core crawling logic, including:
//! - Page sources that load partitions and follow next-page controls
//! - Record extraction from directory markup
//! - Pagination with repeated-page termination
//! - Partition orchestration and run wiring

mod extractor;
mod harvest;
mod orchestrator;
mod page_crawler;
mod source;

pub use extractor::{HtmlTableExtractor, RecordExtractor};
pub use harvest::{
    assemble_dataset, build_joiner, crawl_partitions, run_harvest, HarvestMode,
};
pub use orchestrator::{PartitionOrchestrator, PartitionReport};
pub use page_crawler::{distinct_by_name, is_repeat_page, CrawlOutcome, PageCrawler, PartitionFailure};
pub use source::{build_http_client, FixturePageSource, HttpPageSource, PageSource};
