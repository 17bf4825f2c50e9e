//! Shared fixtures for the integration tests

use site_harvest::config::Config;
use site_harvest::crawler::{BrowserLauncher, BrowserSession, LaunchOptions};
use site_harvest::HarvestError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Creates a configuration tuned for a local mock server
pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.timeout_seconds = 2;
    config.crawler.max_workers = 4;
    config.crawler.idle_poll_ms = 50;
    config.http.retry_delay_ms = 0;
    config.http.connect_timeout_seconds = 2;
    config.browser.render_timeout_seconds = 2;
    config.output.base_directory = output_dir.to_path_buf();
    config
}

/// Wraps a page body in a minimal HTML document
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

/// Counts launches and releases made through a [`FakeLauncher`]
#[derive(Debug, Default)]
pub struct LaunchCounter {
    pub launched: AtomicUsize,
    pub released: AtomicUsize,
}

impl LaunchCounter {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// In-process stand-in for a browser
///
/// Pages are served by path from a fixed map; unknown paths fail to render.
/// With no pages at all, every launch fails.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pages: Arc<HashMap<String, String>>,
    pub counter: Arc<LaunchCounter>,
}

impl FakeLauncher {
    /// A launcher whose browser never starts
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// A launcher serving `(path, html)` pairs
    pub fn serving(pages: &[(&str, String)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(path, html)| (path.to_string(), html.clone()))
                    .collect(),
            ),
            counter: Arc::new(LaunchCounter::default()),
        }
    }
}

pub struct FakeSession {
    pages: Arc<HashMap<String, String>>,
    counter: Arc<LaunchCounter>,
}

impl BrowserLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self, _options: &LaunchOptions) -> Result<FakeSession, HarvestError> {
        if self.pages.is_empty() {
            return Err(HarvestError::Browser("no browser installed".to_string()));
        }
        self.counter.launched.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            pages: Arc::clone(&self.pages),
            counter: Arc::clone(&self.counter),
        })
    }
}

impl BrowserSession for FakeSession {
    async fn page_source(&self, url: &Url, _timeout: Duration) -> Result<String, HarvestError> {
        self.pages
            .get(url.path())
            .cloned()
            .ok_or_else(|| HarvestError::Browser(format!("navigation to {} failed", url)))
    }

    async fn close(self) {
        self.counter.released.fetch_add(1, Ordering::SeqCst);
    }
}
