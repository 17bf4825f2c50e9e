//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Browser rendering for JavaScript-heavy sites
//! - Static-vs-dynamic site classification
//! - HTML parsing, text extraction and link discovery
//! - The shared frontier and the worker pool that drains it

mod browser;
mod coordinator;
mod detector;
mod fetcher;
mod frontier;
mod parser;

pub use browser::{
    get_page_source, BrowserGuard, BrowserLauncher, BrowserSession, ChromeLauncher,
    ChromeSession, LaunchOptions, PageLoad,
};
pub use coordinator::{Coordinator, SeedPlan};
pub use detector::{exceeds_threshold, is_dynamic, measured_length};
pub use fetcher::{FetchOutcome, FetchRequest, HttpFetcher};
pub use frontier::{Frontier, Job};
pub use parser::{cleaned_text, extract_visible_text, normalized_links, parse_html, raw_text, ParsedPage};

use crate::config::Config;
use crate::output::CrawlResult;
use crate::HarvestError;
use serde::Serialize;
use std::fmt;

/// How the frontier is seeded and whether pages feed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Seeded from sitemaps; fetched pages are not mined for links
    Flat,
    /// Seeded from the origin; every fetched page's links are enqueued
    Discovery,
}

/// Which fetcher retrieves pages for the whole crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP through the worker pool
    Http,
    /// Sequential rendering through a single browser session
    Browser,
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Discovery => write!(f, "discovery"),
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

/// Runs a complete crawl with the default Chromium launcher
///
/// This is the main entry point for crawling a site. It will:
/// 1. Normalize the origin
/// 2. Seed the frontier from sitemaps, or classify the site and start from
///    the origin page
/// 3. Drain the frontier with the chosen fetch strategy
/// 4. Persist the collected records
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `origin` - The site to crawl
/// * `name` - Output directory name; derived from the origin when `None`
///
/// # Returns
///
/// * `Ok(CrawlResult)` - Crawl completed
/// * `Err(HarvestError)` - The origin was invalid or unreachable, or the
///   output could not be written
pub async fn crawl(config: Config, origin: &str, name: Option<&str>) -> Result<CrawlResult, HarvestError> {
    Coordinator::new(config)?.crawl(origin, name).await
}
