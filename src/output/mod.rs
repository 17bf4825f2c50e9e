//! Output module for collecting and persisting crawl results
//!
//! This module handles:
//! - Accumulating page records, skipped documents and errored URLs while
//!   workers run
//! - Handing the collections to a persistence sink exactly once
//! - Writing JSON or SQLite artifacts

mod json;
mod sqlite_output;
mod traits;

pub use json::{JsonSink, ERRORED_FILE, PAGES_FILE, SKIPPED_FILE};
pub use sqlite_output::{SqliteSink, DATABASE_FILE};
pub use traits::{CrawlResult, CrawlSink, OutputError, OutputResult, PageRecord};

use crate::config::{OutputConfig, OutputFormat};
use crate::crawler::{CrawlMode, FetchStrategy};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One observation made by a worker
#[derive(Debug, Clone)]
pub enum Record {
    Page(PageRecord),
    SkippedDocument(String),
    Errored(String),
}

#[derive(Debug, Default)]
struct Collected {
    pages: Vec<PageRecord>,
    skipped_document_urls: Vec<String>,
    errored_urls: Vec<String>,
}

/// Describes the crawl that produced a result
#[derive(Debug, Clone)]
pub struct CrawlInfo {
    pub origin: String,
    pub mode: CrawlMode,
    pub strategy: FetchStrategy,
    pub started_at: DateTime<Utc>,
}

/// Thread-safe, append-only accumulator shared by every worker
#[derive(Debug, Default)]
pub struct Aggregator {
    collected: Mutex<Collected>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one record
    pub fn record(&self, record: Record) {
        let mut collected = self.lock();
        match record {
            Record::Page(page) => collected.pages.push(page),
            Record::SkippedDocument(url) => collected.skipped_document_urls.push(url),
            Record::Errored(url) => collected.errored_urls.push(url),
        }
    }

    pub fn record_page(&self, page: PageRecord) {
        self.record(Record::Page(page));
    }

    pub fn record_skipped(&self, url: impl Into<String>) {
        self.record(Record::SkippedDocument(url.into()));
    }

    pub fn record_errored(&self, url: impl Into<String>) {
        self.record(Record::Errored(url.into()));
    }

    /// Returns `(pages, skipped, errored)` counts
    pub fn counts(&self) -> (usize, usize, usize) {
        let collected = self.lock();
        (
            collected.pages.len(),
            collected.skipped_document_urls.len(),
            collected.errored_urls.len(),
        )
    }

    /// Hands the collections to `sink` and builds the crawl result
    ///
    /// The accumulator is emptied, so a second call persists nothing new.
    ///
    /// # Arguments
    ///
    /// * `output_name` - Directory name for the artifacts
    /// * `sink` - Persistence collaborator
    /// * `info` - Origin, mode, strategy and start time of the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The persisted result and its directory
    /// * `Err(OutputError)` - The sink failed to write
    pub fn finalize(
        &self,
        output_name: &str,
        sink: &dyn CrawlSink,
        info: CrawlInfo,
    ) -> OutputResult<CrawlResult> {
        let collected = std::mem::take(&mut *self.lock());

        let output_directory = sink.persist(
            output_name,
            &collected.pages,
            &collected.skipped_document_urls,
            &collected.errored_urls,
        )?;

        Ok(CrawlResult {
            pages: collected.pages,
            skipped_document_urls: collected.skipped_document_urls,
            errored_urls: collected.errored_urls,
            output_directory,
            origin: info.origin,
            mode: info.mode,
            strategy: info.strategy,
            started_at: info.started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Builds the sink selected by the output configuration
pub fn sink_for(config: &OutputConfig) -> Box<dyn CrawlSink + Send + Sync> {
    match config.format {
        OutputFormat::Json => Box::new(JsonSink::new(&config.base_directory)),
        OutputFormat::Sqlite => Box::new(SqliteSink::new(&config.base_directory)),
    }
}
