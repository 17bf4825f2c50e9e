//! JSON file sink
//!
//! Writes `pages.json`, and `skipped_documents.json` / `errored_urls.json`
//! when those lists are non-empty.

use crate::output::traits::{prepare_directory, CrawlSink, OutputResult, PageRecord};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const PAGES_FILE: &str = "pages.json";
pub const SKIPPED_FILE: &str = "skipped_documents.json";
pub const ERRORED_FILE: &str = "errored_urls.json";

/// Writes crawl output as pretty-printed JSON files
#[derive(Debug, Clone)]
pub struct JsonSink {
    base_directory: PathBuf,
}

impl JsonSink {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }
}

impl CrawlSink for JsonSink {
    fn persist(
        &self,
        output_name: &str,
        pages: &[PageRecord],
        skipped_document_urls: &[String],
        errored_urls: &[String],
    ) -> OutputResult<PathBuf> {
        let directory = prepare_directory(&self.base_directory, output_name)?;

        write_json(&directory.join(PAGES_FILE), &pages)?;
        if !skipped_document_urls.is_empty() {
            write_json(&directory.join(SKIPPED_FILE), &skipped_document_urls)?;
        }
        if !errored_urls.is_empty() {
            write_json(&directory.join(ERRORED_FILE), &errored_urls)?;
        }

        tracing::info!(
            "Wrote {} pages to {}",
            pages.len(),
            directory.display()
        );
        Ok(directory)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
