//! SQLite output sink
//!
//! This module writes crawl output to a single `crawl.db` database per crawl
//! directory. The database is recreated on every crawl.

use crate::output::traits::{prepare_directory, CrawlSink, OutputResult, PageRecord};
use rusqlite::{params, Connection};
use std::path::PathBuf;

pub const DATABASE_FILE: &str = "crawl.db";

/// SQL for the always-present page table
const PAGES_SQL: &str = r#"
CREATE TABLE pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    heading TEXT NOT NULL,
    raw_text TEXT NOT NULL,
    cleaned_text TEXT NOT NULL
);
"#;

const SKIPPED_SQL: &str = r#"
CREATE TABLE skipped_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE
);
"#;

const ERRORED_SQL: &str = r#"
CREATE TABLE errored_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE
);
"#;

/// Writes crawl output to SQLite
#[derive(Debug, Clone)]
pub struct SqliteSink {
    base_directory: PathBuf,
}

impl SqliteSink {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }
}

impl CrawlSink for SqliteSink {
    fn persist(
        &self,
        output_name: &str,
        pages: &[PageRecord],
        skipped_document_urls: &[String],
        errored_urls: &[String],
    ) -> OutputResult<PathBuf> {
        let directory = prepare_directory(&self.base_directory, output_name)?;
        let path = directory.join(DATABASE_FILE);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let mut conn = Connection::open(&path)?;
        let tx = conn.transaction()?;

        tx.execute_batch(PAGES_SQL)?;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO pages (url, heading, raw_text, cleaned_text)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for page in pages {
                insert.execute(params![
                    page.url,
                    page.heading,
                    page.raw_text,
                    page.cleaned_text
                ])?;
            }
        }

        if !skipped_document_urls.is_empty() {
            tx.execute_batch(SKIPPED_SQL)?;
            insert_urls(&tx, "skipped_documents", skipped_document_urls)?;
        }
        if !errored_urls.is_empty() {
            tx.execute_batch(ERRORED_SQL)?;
            insert_urls(&tx, "errored_urls", errored_urls)?;
        }

        tx.commit()?;

        tracing::info!("Wrote {} pages to {}", pages.len(), path.display());
        Ok(directory)
    }
}

fn insert_urls(conn: &Connection, table: &str, urls: &[String]) -> rusqlite::Result<()> {
    let mut insert = conn.prepare(&format!("INSERT OR IGNORE INTO {} (url) VALUES (?1)", table))?;
    for url in urls {
        insert.execute(params![url])?;
    }
    Ok(())
}
