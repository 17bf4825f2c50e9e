//! Sitemap fetching and expansion
//!
//! Sitemap indexes are expanded recursively into a flat set of page URLs,
//! bounded by a maximum depth. Gzip payloads are inflated before parsing.

use crate::crawler::HttpFetcher;
use crate::crawler::FetchOutcome;
use crate::url::normalize_url;
use flate2::read::GzDecoder;
use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use url::Url;
use xml::reader::{EventReader, XmlEvent};

/// First two bytes of every gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Contents of one parsed sitemap document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `*loc` values of a `urlset`, as written
    pub pages: Vec<String>,
    /// `*loc` values of a `sitemapindex`, as written
    pub children: Vec<String>,
}

impl SitemapDocument {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.children.is_empty()
    }
}

/// Expands a sitemap into the set of page URLs it lists
///
/// # Expansion Rules
///
/// - `urlset` documents contribute every `<loc>`, normalized
/// - `sitemapindex` documents queue every child `<loc>` for expansion, but
///   only while the parent's depth is below `max_depth`
/// - Each sitemap URL is fetched at most once per call, even when several
///   indexes reference it
/// - Fetch failures, malformed XML and unrecognized documents contribute
///   nothing; expansion continues with the remaining sitemaps
///
/// # Arguments
///
/// * `fetcher` - HTTP client
/// * `sitemap_url` - The sitemap or sitemap index to expand (depth 0)
/// * `max_depth` - Deepest index level whose children are still followed
///
/// # Returns
///
/// The flattened, deduplicated page URLs
pub async fn expand_sitemap(fetcher: &HttpFetcher, sitemap_url: &Url, max_depth: u32) -> BTreeSet<Url> {
    let mut pages = BTreeSet::new();
    let mut expanded: HashSet<String> = HashSet::new();
    let mut pending: Vec<(Url, u32)> = vec![(sitemap_url.clone(), 0)];

    while let Some((url, depth)) = pending.pop() {
        if !expanded.insert(url.as_str().to_string()) {
            tracing::debug!("Sitemap {} already expanded", url);
            continue;
        }

        let document = match fetch_sitemap(fetcher, &url).await {
            Some(document) => document,
            None => continue,
        };

        for loc in &document.pages {
            match resolve_loc(&url, loc) {
                Ok(page) => {
                    pages.insert(page);
                }
                Err(e) => tracing::debug!("Skipping sitemap entry {}: {}", loc, e),
            }
        }

        if document.children.is_empty() {
            continue;
        }

        if depth >= max_depth {
            tracing::warn!(
                "Sitemap index {} at depth {} exceeds max depth {}; skipping {} children",
                url,
                depth,
                max_depth,
                document.children.len()
            );
            continue;
        }

        // Reversed so children are expanded in document order
        for child in document.children.iter().rev() {
            match resolve_loc(&url, child) {
                Ok(child_url) => pending.push((child_url, depth + 1)),
                Err(e) => tracing::debug!("Skipping child sitemap {}: {}", child, e),
            }
        }
    }

    tracing::info!("Sitemap {} expanded to {} URLs", sitemap_url, pages.len());
    pages
}

/// Fetches, inflates and parses one sitemap
async fn fetch_sitemap(fetcher: &HttpFetcher, url: &Url) -> Option<SitemapDocument> {
    let (body, content_type) = match fetcher.get(url).await {
        FetchOutcome::Success {
            body, content_type, ..
        } => (body, content_type),
        FetchOutcome::Failure { error, .. } => {
            tracing::warn!("Failed to fetch sitemap {}: {}", url, error);
            return None;
        }
    };

    let xml = if is_gzip(url, &content_type, &body) {
        match gunzip(&body) {
            Ok(inflated) => inflated,
            Err(e) => {
                tracing::warn!("Failed to decompress sitemap {}: {}", url, e);
                return None;
            }
        }
    } else {
        body
    };

    match parse_sitemap(&xml) {
        Ok(document) if document.is_empty() => {
            tracing::warn!("Sitemap {} has no entries or an unrecognized root", url);
            None
        }
        Ok(document) => {
            tracing::debug!(
                "Sitemap {}: {} pages, {} child sitemaps",
                url,
                document.pages.len(),
                document.children.len()
            );
            Some(document)
        }
        Err(e) => {
            tracing::warn!("Malformed sitemap {}: {}", url, e);
            None
        }
    }
}

/// Decides whether a sitemap payload needs inflating
///
/// The URL must end in `.gz` or the content type must mention gzip, and the
/// payload must still start with the gzip magic bytes.
pub fn is_gzip(url: &Url, content_type: &str, body: &[u8]) -> bool {
    let declared = url.path().to_ascii_lowercase().ends_with(".gz")
        || content_type.to_ascii_lowercase().contains("gzip");
    declared && body.starts_with(&GZIP_MAGIC)
}

/// Inflates a gzip payload
pub fn gunzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut inflated = Vec::new();
    GzDecoder::new(body).read_to_end(&mut inflated)?;
    Ok(inflated)
}

/// Resolves a `loc` value against the sitemap it came from, then normalizes it
fn resolve_loc(sitemap_url: &Url, loc: &str) -> Result<Url, String> {
    let joined = sitemap_url.join(loc).map_err(|e| e.to_string())?;
    normalize_url(joined.as_str()).map_err(|e| e.to_string())
}

/// Returns true for element names ending in `loc` (`loc`, `image:loc`, `content_loc`)
fn is_loc(local_name: &str) -> bool {
    local_name.to_ascii_lowercase().ends_with("loc")
}

/// Parses a sitemap or sitemap index
///
/// Matching uses local names, so namespace prefixes are ignored. Under a
/// `urlset` root every element whose name ends in `loc` is a page; under a
/// `sitemapindex` root each one is a child sitemap. Values are returned
/// trimmed but unresolved. Any other root yields an empty document, and any
/// XML error yields an error and no entries.
pub fn parse_sitemap(xml: &[u8]) -> Result<SitemapDocument, String> {
    let mut root: Option<String> = None;
    let mut locs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for event in EventReader::new(xml) {
        match event.map_err(|e| e.to_string())? {
            XmlEvent::StartElement { name, .. } => {
                if root.is_none() {
                    root = Some(name.local_name.to_ascii_lowercase());
                } else if is_loc(&name.local_name) {
                    current = Some(String::new());
                }
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                if let Some(buffer) = current.as_mut() {
                    buffer.push_str(&text);
                }
            }
            XmlEvent::EndElement { name } => {
                if is_loc(&name.local_name) {
                    if let Some(buffer) = current.take() {
                        let value = buffer.trim();
                        if !value.is_empty() {
                            locs.push(value.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut document = SitemapDocument::default();
    match root.as_deref() {
        Some("urlset") => document.pages = locs,
        Some("sitemapindex") => document.children = locs,
        _ => {}
    }
    Ok(document)
}
