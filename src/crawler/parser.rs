//! HTML parser for extracting links and visible text
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Same-origin links to follow (from `<a>` tags)
//! - Visible text, both raw and whitespace-collapsed

use crate::url::{normalize_url, same_origin};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text content is never visible
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Characters removed from raw text
const RAW_STRIPPED: &[char] = &['\n', '\t', '\r', '\u{0B}', '\u{0C}', '\u{A0}'];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from `<title>` tag)
    pub title: Option<String>,

    /// Same-origin links found on the page, absolute and without fragments
    pub links: Vec<Url>,

    /// Visible text with line breaks and non-breaking spaces removed
    pub raw_text: String,

    /// Visible text with whitespace runs collapsed to single spaces
    pub cleaned_text: String,
}

/// Parses HTML content and extracts title, links and text
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags resolving to http(s) URLs on the same origin as
///   `page_url`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Links to other hosts or ports
///
/// Fragments are dropped from every extracted link, and links are not
/// normalized here; callers normalize before enqueueing.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the HTML was fetched from
///
/// # Returns
///
/// The parsed page. Malformed HTML never fails; the parser recovers.
///
/// # Example
///
/// ```
/// use site_harvest::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &page_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, page_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = base_href(&document, page_url);

    let visible = visible_text(&document);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, &base, page_url),
        raw_text: raw_text(&visible),
        cleaned_text: cleaned_text(&visible),
    }
}

/// Returns the visible text of an HTML document
///
/// Text inside `<script>`, `<style>`, `<noscript>` and `<template>` is
/// excluded. Text nodes are concatenated in document order.
pub fn extract_visible_text(html: &str) -> String {
    visible_text(&Html::parse_document(html))
}

/// Removes line breaks, tabs and non-breaking spaces after trimming
pub fn raw_text(text: &str) -> String {
    text.trim().chars().filter(|c| !RAW_STRIPPED.contains(c)).collect()
}

/// Collapses every whitespace run to a single space and trims
pub fn cleaned_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Honors `<base href>` when present
fn base_href(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Extracts all same-origin links from the HTML document
fn extract_links(document: &Html, base: &Url, page_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base) {
                    if same_origin(&absolute_url, page_url) {
                        links.push(absolute_url);
                    }
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL without fragment
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url)
}

fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    collect_text(document.root_element(), &mut text);
    text
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if INVISIBLE_ELEMENTS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Resolves and normalizes every link of a parsed page
///
/// Links that fail normalization are dropped with a debug log.
pub fn normalized_links(parsed: &ParsedPage) -> Vec<Url> {
    parsed
        .links
        .iter()
        .filter_map(|link| match normalize_url(link.as_str()) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Dropping link {}: {}", link, e);
                None
            }
        })
        .collect()
}
