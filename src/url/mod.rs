//! URL handling module for Site-Harvest
//!
//! This module provides URL normalization, same-origin checks, output naming
//! and link classification.

mod classify;
mod normalize;

use url::Url;

// Re-export main functions
pub use classify::{classify_url, LinkKind};
pub use normalize::{normalize_url, strip_invisible};

/// Returns the origin root of a URL (`scheme://host[:port]/`)
pub fn origin_root(url: &Url) -> Url {
    let mut root = url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
}

/// Checks whether two URLs share host and effective port
///
/// Subdomains are distinct hosts; `www.example.com` is not same-origin with
/// `example.com`.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Returns the last non-empty path segment, or the host when the path is empty
pub fn last_path_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Derives a filesystem-safe output name from a crawl origin
///
/// The name is the last `/`-separated segment of the origin with trailing
/// slashes removed, so `https://example.com/` becomes `example.com` and
/// `https://example.com/docs/` becomes `docs`.
///
/// # Examples
///
/// ```
/// use site_harvest::url::output_name_for;
/// use url::Url;
///
/// let origin = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(output_name_for(&origin), "127.0.0.1_8080");
/// ```
pub fn output_name_for(origin: &Url) -> String {
    let trimmed = origin.as_str().trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    sanitize_output_name(segment)
}

/// Replaces characters outside `[A-Za-z0-9._-]` with underscores
pub fn sanitize_output_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "crawl".to_string()
    } else {
        sanitized
    }
}
