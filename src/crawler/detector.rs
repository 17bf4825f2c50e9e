//! One-shot static-vs-dynamic site classification
//!
//! The origin is fetched once over plain HTTP and once through a browser.
//! If the rendered text is materially longer, the site needs a browser.

use crate::crawler::browser::{get_page_source, BrowserGuard, BrowserLauncher, LaunchOptions};
use crate::crawler::fetcher::{FetchOutcome, HttpFetcher};
use crate::crawler::parser::{extract_visible_text, raw_text};
use std::time::Duration;
use url::Url;

/// Decides whether `url` needs browser rendering
///
/// # Decision Rule
///
/// | Condition | Verdict |
/// |-----------|---------|
/// | HTTP fetch fails | dynamic |
/// | Browser launch or render fails | static |
/// | `len_http > 0` and `(len_browser - len_http) / len_http > threshold` | dynamic |
/// | otherwise | static |
///
/// Both lengths are measured by [`measured_length`] over the visible text,
/// so markup renders to the same count either way. The browser session is
/// released before returning on every path.
///
/// # Arguments
///
/// * `fetcher` - HTTP client
/// * `launcher` - Starts the browser session used for comparison
/// * `options` - Launch options; callers pass [`crate::crawler::PageLoad::Eager`]
/// * `url` - The page to compare, normally the site origin
/// * `timeout` - DOM-ready wait bound for the browser fetch
/// * `threshold` - Relative gain above which the site is dynamic
pub async fn is_dynamic<L: BrowserLauncher>(
    fetcher: &HttpFetcher,
    launcher: &L,
    options: &LaunchOptions,
    url: &Url,
    timeout: Duration,
    threshold: f64,
) -> bool {
    let http_html = match fetcher.get(url).await {
        outcome @ FetchOutcome::Success { .. } => outcome.text().unwrap_or_default(),
        FetchOutcome::Failure { error, .. } => {
            tracing::warn!("HTTP fetch of {} failed ({}); assuming dynamic", url, error);
            return true;
        }
    };
    let len_http = measured_length(&extract_visible_text(&http_html));

    let guard = match BrowserGuard::acquire(launcher, options).await {
        Ok(guard) => guard,
        Err(e) => {
            tracing::warn!("Browser unavailable ({}); assuming static", e);
            return false;
        }
    };

    let rendered = get_page_source(&*guard, url, timeout).await;
    guard.release().await;

    let len_browser = match rendered {
        Ok((raw, _)) => measured_length(&raw),
        Err(e) => {
            tracing::warn!("Browser fetch of {} failed ({}); assuming static", url, e);
            return false;
        }
    };

    let dynamic = exceeds_threshold(len_http, len_browser, threshold);
    tracing::info!(
        "Site classified as {} (http: {} chars, browser: {} chars)",
        if dynamic { "dynamic" } else { "static" },
        len_http,
        len_browser
    );
    dynamic
}

/// Character count of visible text after control characters are stripped
pub fn measured_length(visible: &str) -> usize {
    raw_text(visible).chars().count()
}

/// Applies the length-delta rule
///
/// Returns false when the HTTP text is empty, since no ratio exists.
pub fn exceeds_threshold(len_http: usize, len_browser: usize, threshold: f64) -> bool {
    if len_http == 0 {
        return false;
    }
    let gain = (len_browser as f64 - len_http as f64) / len_http as f64;
    gain > threshold
}
