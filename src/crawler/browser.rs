//! Browser fetcher for sites that render their content with JavaScript
//!
//! A browser session is expensive and not shareable, so one session is
//! acquired per crawl and driven serially. Sessions are held in a
//! [`BrowserGuard`], which releases them on every exit path.

use crate::crawler::parser::{cleaned_text, extract_visible_text, raw_text};
use crate::url::normalize_url;
use crate::HarvestError;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Interval between DOM-ready checks
const READY_POLL: Duration = Duration::from_millis(100);

/// How long a navigation waits before content is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageLoad {
    /// Wait for the load event
    #[default]
    Normal,
    /// Return once navigation commits, then wait only for `<body>`
    Eager,
}

/// Options for starting a browser session
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub page_load: PageLoad,
}

impl LaunchOptions {
    pub fn from_config(config: &crate::config::BrowserConfig, page_load: PageLoad) -> Self {
        Self {
            headless: config.headless,
            executable: config.executable.clone(),
            page_load,
        }
    }
}

/// Starts browser sessions
#[allow(async_fn_in_trait)]
pub trait BrowserLauncher {
    type Session: BrowserSession;

    /// Acquires a new session
    async fn launch(&self, options: &LaunchOptions) -> Result<Self::Session, HarvestError>;
}

/// A live browser session
#[allow(async_fn_in_trait)]
pub trait BrowserSession: Sized {
    /// Navigates to `url` and returns the rendered HTML
    ///
    /// A DOM-ready wait that exceeds `timeout` is not an error; whatever
    /// has rendered by then is returned.
    async fn page_source(&self, url: &Url, timeout: Duration) -> Result<String, HarvestError>;

    /// Shuts the session down
    async fn close(self);
}

/// Scoped owner of a browser session
///
/// Prefer [`BrowserGuard::release`], which awaits an orderly shutdown. If the
/// guard is dropped instead (early return, panic unwinding), the session is
/// dropped synchronously, which tears down the browser process.
pub struct BrowserGuard<S: BrowserSession> {
    session: Option<S>,
}

impl<S: BrowserSession> BrowserGuard<S> {
    /// Launches a session and wraps it
    pub async fn acquire<L>(launcher: &L, options: &LaunchOptions) -> Result<Self, HarvestError>
    where
        L: BrowserLauncher<Session = S>,
    {
        let session = launcher.launch(options).await?;
        tracing::debug!("Browser session acquired");
        Ok(Self {
            session: Some(session),
        })
    }

    /// Closes the session, consuming the guard
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
            tracing::debug!("Browser session released");
        }
    }
}

impl<S: BrowserSession> Deref for BrowserGuard<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        // Only `release` takes the session, and it consumes the guard.
        match &self.session {
            Some(session) => session,
            None => unreachable!("browser session taken before guard was released"),
        }
    }
}

impl<S: BrowserSession> Drop for BrowserGuard<S> {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            tracing::warn!("Browser session dropped without release; tearing down");
        }
    }
}

/// Renders a page and returns its visible text as `(raw_text, cleaned_text)`
///
/// The URL is normalized again before navigation, since browser engines
/// reject malformed unicode and control characters differently than HTTP
/// clients.
///
/// # Arguments
///
/// * `session` - The browser session to drive
/// * `url` - The page to render
/// * `timeout` - DOM-ready wait bound
///
/// # Returns
///
/// * `Ok((raw, cleaned))` - Visible text of the rendered page
/// * `Err(HarvestError)` - The URL was invalid or navigation failed
pub async fn get_page_source<S: BrowserSession>(
    session: &S,
    url: &Url,
    timeout: Duration,
) -> Result<(String, String), HarvestError> {
    let sanitized = normalize_url(url.as_str())?;
    let html = session.page_source(&sanitized, timeout).await?;
    let visible = extract_visible_text(&html);
    Ok((raw_text(&visible), cleaned_text(&visible)))
}

/// Launches headless Chromium through the DevTools protocol
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher;

impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self, options: &LaunchOptions) -> Result<ChromeSession, HarvestError> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--ignore-certificate-errors")
            .arg("--incognito")
            .arg("--disable-blink-features=AutomationControlled");

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder
            .build()
            .map_err(|e| HarvestError::Browser(format!("Browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(format!("Browser launch failed: {}", e)))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        tracing::info!(
            "Launched Chromium (headless: {}, load: {:?})",
            options.headless,
            options.page_load
        );

        Ok(ChromeSession {
            browser: Some(browser),
            handler_task,
            page_load: options.page_load,
        })
    }
}

/// A running Chromium instance
pub struct ChromeSession {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
    page_load: PageLoad,
}

impl ChromeSession {
    fn browser(&self) -> Result<&Browser, HarvestError> {
        self.browser
            .as_ref()
            .ok_or_else(|| HarvestError::Browser("browser already closed".to_string()))
    }

    async fn render(&self, page: &Page, url: &Url, timeout: Duration) -> Result<String, HarvestError> {
        let deadline = Instant::now() + timeout;

        match self.page_load {
            PageLoad::Normal => navigate_within(page.goto(url.as_str()), url, timeout).await?,
            PageLoad::Eager => {
                navigate_within(page.execute(NavigateParams::new(url.as_str())), url, timeout)
                    .await?
            }
        }

        if !wait_for_body(page, deadline).await {
            tracing::warn!(
                "DOM not ready for {} within {:?}; using partial content",
                url,
                timeout
            );
        }

        page.content()
            .await
            .map_err(|e| HarvestError::Browser(format!("Reading content of {} failed: {}", url, e)))
    }
}

/// Awaits a navigation for at most `timeout`
///
/// A navigation error is returned; running out of time is only logged, and
/// the caller reads whatever has rendered.
async fn navigate_within<F, T, E>(navigation: F, url: &Url, timeout: Duration) -> Result<(), HarvestError>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match tokio::time::timeout(timeout, navigation).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(HarvestError::Browser(format!(
            "Navigation to {} failed: {}",
            url, e
        ))),
        Err(_) => {
            tracing::warn!("Navigation to {} not finished within {:?}", url, timeout);
            Ok(())
        }
    }
}

/// Polls for `<body>` until it exists or the deadline passes
async fn wait_for_body(page: &Page, deadline: Instant) -> bool {
    loop {
        if page.find_element("body").await.is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(READY_POLL).await;
    }
}

impl BrowserSession for ChromeSession {
    async fn page_source(&self, url: &Url, timeout: Duration) -> Result<String, HarvestError> {
        let page = self
            .browser()?
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to open tab: {}", e)))?;

        let result = self.render(&page, url, timeout).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Tab close failed for {}: {}", url, e);
        }

        result
    }

    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Browser close failed: {}", e);
            }
        }
        self.handler_task.abort();
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
