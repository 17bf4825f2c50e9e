//! Site-Harvest: a website-to-corpus crawler
//!
//! This crate crawls a single website and produces a structured corpus of page
//! text for downstream indexing. It discovers URLs from sitemaps or from the
//! pages themselves, decides once per site whether plain HTTP is enough or a
//! headless browser is required, and partitions every discovered link into
//! page records, skipped documents and unreachable URLs.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Harvest operations
///
/// Only URL normalization of the origin and a completely unreachable origin
/// are fatal to a crawl. Per-URL failures never surface here; they end up in
/// the crawl result's errored URL list.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Origin could not be fetched: {url}")]
    OriginUnreachable { url: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Result type alias for Site-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlMode, FetchStrategy};
pub use output::{CrawlResult, PageRecord};
pub use url::{classify_url, normalize_url, LinkKind};
