//! Robots.txt and sitemap discovery module
//!
//! This module finds the sitemaps a site advertises in its robots.txt and
//! expands them into the flat set of page URLs used to seed a crawl.

mod expansion;

pub use expansion::{expand_sitemap, gunzip, is_gzip, parse_sitemap, SitemapDocument};

use crate::crawler::{FetchOutcome, HttpFetcher};
use crate::url::origin_root;
use url::Url;

/// Fetches `{origin}/robots.txt` and returns the sitemaps it declares
///
/// Never fails: an unreachable or non-200 robots.txt yields no sitemaps.
///
/// # Arguments
///
/// * `fetcher` - HTTP client
/// * `origin` - The site origin; only its scheme, host and port are used
///
/// # Returns
///
/// Sitemap URLs in the order they were declared, without duplicates
pub async fn resolve_sitemaps(fetcher: &HttpFetcher, origin: &Url) -> Vec<Url> {
    let root = origin_root(origin);
    let robots_url = match root.join("robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", origin, e);
            return Vec::new();
        }
    };

    let body = match fetcher.get(&robots_url).await {
        outcome @ FetchOutcome::Success { .. } => outcome.text().unwrap_or_default(),
        FetchOutcome::Failure { error, .. } => {
            tracing::info!("No robots.txt at {} ({})", robots_url, error);
            return Vec::new();
        }
    };

    let sitemaps = parse_sitemap_directives(&body, &root);
    tracing::info!(
        "Found {} sitemap(s) in {}",
        sitemaps.len(),
        robots_url
    );
    sitemaps
}

/// Extracts `Sitemap:` directives from robots.txt content
///
/// Matching is case-insensitive and tolerates a leading `#` (commented
/// directives are still honored). Relative values are resolved against
/// `origin`. Duplicates are dropped, keeping first-seen order.
///
/// # Examples
///
/// ```
/// use site_harvest::robots::parse_sitemap_directives;
/// use url::Url;
///
/// let origin = Url::parse("https://example.com/").unwrap();
/// let robots = "User-agent: *\nSITEMAP: /sitemap.xml\n";
/// let sitemaps = parse_sitemap_directives(robots, &origin);
/// assert_eq!(sitemaps[0].as_str(), "https://example.com/sitemap.xml");
/// ```
pub fn parse_sitemap_directives(content: &str, origin: &Url) -> Vec<Url> {
    let mut sitemaps: Vec<Url> = Vec::new();

    for line in content.lines() {
        let Some(value) = directive_value(line) else {
            continue;
        };

        let resolved = match Url::parse(value) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(url),
            _ => origin.join(value),
        };

        match resolved {
            Ok(url) => {
                if !sitemaps.contains(&url) {
                    sitemaps.push(url);
                }
            }
            Err(e) => tracing::debug!("Ignoring sitemap directive {:?}: {}", value, e),
        }
    }

    sitemaps
}

/// Returns the value of a `sitemap:` line, if it is one
fn directive_value(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let line = line.strip_prefix('#').unwrap_or(line).trim_start();

    let keyword = line.get(..7)?;
    if !keyword.eq_ignore_ascii_case("sitemap") {
        return None;
    }

    let rest = line[7..].trim_start().strip_prefix(':')?.trim_start();
    let value = rest
        .split(|c: char| c.is_whitespace() || c == '#')
        .next()
        .unwrap_or("");

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
