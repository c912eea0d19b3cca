//! Paginated crawl of a single partition
//!
//! The crawler keeps loading pages until one of them carries nothing new.
//! Termination is decided from the records themselves rather than from page
//! counts or URL patterns, because the directory's pager can wrap around or
//! leave a stale next-page control in place.
//!
//! # Termination Rule
//!
//! | Page contents | Action |
//! |---------------|--------|
//! | No records | Stop (`EmptyPage`) |
//! | Every name already seen | Stop (`RepeatedPage`) |
//! | At least one new name | Merge whole page, advance |
//! | No next-page control | Stop after merging (`NoNextPage`) |
//! | Page bound reached | Stop after merging (`PageLimit`) |

use crate::crawler::extractor::{resolve_image_refs, RecordExtractor};
use crate::crawler::source::PageSource;
use crate::records::{DirectoryRecord, Partition};
use crate::state::StopReason;
use crate::HarvestError;
use std::collections::HashSet;
use std::time::Duration;

/// Records gathered from one partition
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub partition: Partition,

    /// Every record merged, in page-encounter order
    pub records: Vec<DirectoryRecord>,

    pub pages_visited: u32,
    pub stop_reason: StopReason,
}

impl CrawlOutcome {
    /// The records to persist: first occurrence of each name, in order
    ///
    /// Returns the distinct records and how many later repeats were dropped.
    pub fn into_partition_output(self) -> (Vec<DirectoryRecord>, usize) {
        distinct_by_name(self.records)
    }
}

/// A partition crawl that ended in a page load error
///
/// Carries what had been accumulated so the caller can apply its partial
/// results policy explicitly.
#[derive(Debug)]
pub struct PartitionFailure {
    pub partition: Partition,
    pub error: HarvestError,
    pub partial: Vec<DirectoryRecord>,
    pub pages_visited: u32,
}

/// Drives one partition through load, extract, decide cycles
pub struct PageCrawler<'a, E: RecordExtractor + ?Sized> {
    extractor: &'a E,
    settle: Duration,
    max_pages: Option<u32>,
}

#[derive(Default)]
struct CrawlState {
    seen: HashSet<String>,
    accumulated: Vec<DirectoryRecord>,
    pages_visited: u32,
}

impl<'a, E: RecordExtractor + ?Sized> PageCrawler<'a, E> {
    /// Creates a page crawler
    ///
    /// # Arguments
    ///
    /// * `extractor` - Converts page markup into records
    /// * `settle` - Wait after each pagination step before reading content
    /// * `max_pages` - Optional bound on pages per partition
    pub fn new(extractor: &'a E, settle: Duration, max_pages: Option<u32>) -> Self {
        Self {
            extractor,
            settle,
            max_pages,
        }
    }

    /// Crawls every page of a partition
    ///
    /// Page source errors are not swallowed: they come back as a
    /// `PartitionFailure` holding the records accumulated so far.
    pub async fn crawl<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        partition: &Partition,
    ) -> Result<CrawlOutcome, PartitionFailure> {
        let mut state = CrawlState::default();

        match self.crawl_pages(source, partition, &mut state).await {
            Ok(stop_reason) => {
                tracing::info!(
                    partition = %partition,
                    pages = state.pages_visited,
                    records = state.accumulated.len(),
                    reason = %stop_reason,
                    "Partition pagination finished"
                );
                Ok(CrawlOutcome {
                    partition: partition.clone(),
                    records: state.accumulated,
                    pages_visited: state.pages_visited,
                    stop_reason,
                })
            }
            Err(error) => Err(PartitionFailure {
                partition: partition.clone(),
                error,
                partial: state.accumulated,
                pages_visited: state.pages_visited,
            }),
        }
    }

    async fn crawl_pages<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        partition: &Partition,
        state: &mut CrawlState,
    ) -> crate::Result<StopReason> {
        source.load(partition).await?;

        loop {
            let markup = source.current_content().await?;
            state.pages_visited += 1;

            let mut records = self.extractor.extract(&markup);
            if let Some(page) = source.page_url() {
                resolve_image_refs(&mut records, page);
            }
            tracing::debug!(
                partition = %partition,
                page = state.pages_visited,
                records = records.len(),
                "Extracted page"
            );

            if records.is_empty() {
                return Ok(StopReason::EmptyPage);
            }

            if is_repeat_page(&records, &state.seen) {
                tracing::debug!(
                    partition = %partition,
                    page = state.pages_visited,
                    "Every record on page already seen"
                );
                return Ok(StopReason::RepeatedPage);
            }

            for record in records {
                state.seen.insert(record.name.clone());
                state.accumulated.push(record);
            }

            if self
                .max_pages
                .is_some_and(|max| state.pages_visited >= max)
            {
                tracing::warn!(
                    partition = %partition,
                    pages = state.pages_visited,
                    "Page bound reached before the directory repeated"
                );
                return Ok(StopReason::PageLimit);
            }

            tokio::time::sleep(self.settle).await;

            if !source.has_next().await? {
                return Ok(StopReason::NoNextPage);
            }

            source.advance().await?;
            tokio::time::sleep(self.settle).await;
        }
    }
}

/// True iff every record's name is already in `seen`
///
/// A page mixing new and repeated names is not a repeat.
pub fn is_repeat_page(records: &[DirectoryRecord], seen: &HashSet<String>) -> bool {
    records.iter().all(|record| seen.contains(&record.name))
}

/// Keeps the first record for each name, preserving order
pub fn distinct_by_name(records: Vec<DirectoryRecord>) -> (Vec<DirectoryRecord>, usize) {
    let total = records.len();
    let mut names = HashSet::new();
    let distinct: Vec<_> = records
        .into_iter()
        .filter(|record| names.insert(record.name.clone()))
        .collect();
    let dropped = total - distinct.len();
    (distinct, dropped)
}
