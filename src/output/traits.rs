//! Output sink trait and crawl result types
//!
//! This module defines the persistence interface the aggregator hands its
//! collections to, and the records that flow through it.

use crate::crawler::{CrawlMode, FetchStrategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Extracted text of one crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Normalized page URL
    pub url: String,

    /// Page title, or the last path segment when the page has none
    pub heading: String,

    /// Visible text with line breaks and non-breaking spaces removed
    pub raw_text: String,

    /// Visible text with whitespace runs collapsed
    pub cleaned_text: String,
}

/// Final product of a crawl
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub pages: Vec<PageRecord>,
    pub skipped_document_urls: Vec<String>,
    pub errored_urls: Vec<String>,
    pub output_directory: PathBuf,
    pub origin: String,
    pub mode: CrawlMode,
    pub strategy: FetchStrategy,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Total number of URLs that ended up in one of the three collections
    pub fn total_urls(&self) -> usize {
        self.pages.len() + self.skipped_document_urls.len() + self.errored_urls.len()
    }
}

/// Persistence collaborator for crawl output
///
/// Implementations write a page-records artifact always, and the
/// skipped-document and errored-URL artifacts only when their list is
/// non-empty. They return the directory that now holds the artifacts.
pub trait CrawlSink {
    /// Writes the three collections under a directory named `output_name`
    fn persist(
        &self,
        output_name: &str,
        pages: &[PageRecord],
        skipped_document_urls: &[String],
        errored_urls: &[String],
    ) -> OutputResult<PathBuf>;
}

/// Creates `base/output_name` and returns its canonical path
pub(crate) fn prepare_directory(base: &Path, output_name: &str) -> OutputResult<PathBuf> {
    let directory = base.join(output_name);
    std::fs::create_dir_all(&directory)?;
    Ok(directory.canonicalize()?)
}
