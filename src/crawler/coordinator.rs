//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the frontier from sitemaps or from the origin page
//! - Choosing between plain HTTP and browser rendering once per site
//! - Draining the frontier with a worker pool or a sequential browser loop
//! - Handing the collected records to the output sink

use crate::config::{Config, Execution};
use crate::crawler::browser::{
    BrowserGuard, BrowserLauncher, BrowserSession, ChromeLauncher, LaunchOptions, PageLoad,
};
use crate::crawler::detector::is_dynamic;
use crate::crawler::fetcher::{FetchOutcome, HttpFetcher};
use crate::crawler::frontier::{Frontier, Job};
use crate::crawler::parser::{normalized_links, parse_html, ParsedPage};
use crate::crawler::{CrawlMode, FetchStrategy};
use crate::output::{sink_for, Aggregator, CrawlInfo, CrawlResult, PageRecord};
use crate::robots::{expand_sitemap, resolve_sitemaps};
use crate::url::{
    classify_url, last_path_segment, normalize_url, output_name_for, sanitize_output_name,
    LinkKind,
};
use crate::HarvestError;
use chrono::Utc;
use futures::FutureExt;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// Seeds discovered before any page is crawled
#[derive(Debug, Clone)]
pub struct SeedPlan {
    /// Normalized crawl origin
    pub origin: Url,
    /// Sitemaps declared in robots.txt
    pub sitemaps: Vec<Url>,
    /// Page URLs the sitemaps expanded to
    pub seeds: BTreeSet<Url>,
}

impl SeedPlan {
    /// Flat when the sitemaps produced any page URL, discovery otherwise
    pub fn mode(&self) -> CrawlMode {
        if self.seeds.is_empty() {
            CrawlMode::Discovery
        } else {
            CrawlMode::Flat
        }
    }
}

/// How fetched HTML is turned into a [`ParsedPage`]
enum ParseMode {
    /// Parse on the worker itself
    Inline,
    /// Parse on the blocking pool, bounded by the semaphore
    Offload(Arc<Semaphore>),
}

impl ParseMode {
    async fn parse(&self, html: String, url: Url) -> Result<ParsedPage, String> {
        match self {
            Self::Inline => Ok(parse_html(&html, &url)),
            Self::Offload(permits) => {
                let _permit = permits.acquire().await.map_err(|e| e.to_string())?;
                tokio::task::spawn_blocking(move || parse_html(&html, &url))
                    .await
                    .map_err(|e| format!("parse task failed: {}", e))
            }
        }
    }
}

/// Per-crawl state shared by every worker
struct CrawlState {
    frontier: Frontier,
    aggregator: Aggregator,
    mode: CrawlMode,
    processed: AtomicUsize,
    progress_interval: usize,
}

impl CrawlState {
    fn new(mode: CrawlMode, progress_interval: usize) -> Self {
        Self {
            frontier: Frontier::new(),
            aggregator: Aggregator::new(),
            mode,
            processed: AtomicUsize::new(0),
            progress_interval: progress_interval.max(1),
        }
    }

    /// Classifies, fetches and records one URL
    async fn visit<F, Fut>(&self, url: Url, parse: &ParseMode, fetch: F)
    where
        F: FnOnce(Url) -> Fut,
        Fut: Future<Output = Result<String, String>>,
    {
        let kind = classify_url(&url);
        if !kind.should_fetch() {
            if kind == LinkKind::SkippableDocument {
                tracing::debug!("Skipping document {}", url);
                self.aggregator.record_skipped(url.as_str());
            } else {
                tracing::debug!("Skipping image {}", url);
            }
            self.tick();
            return;
        }

        match fetch(url.clone()).await {
            Ok(html) => match parse.parse(html, url.clone()).await {
                Ok(parsed) => self.absorb(&url, parsed),
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", url, e);
                    self.aggregator.record_errored(url.as_str());
                }
            },
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                self.aggregator.record_errored(url.as_str());
            }
        }
        self.tick();
    }

    /// Runs [`CrawlState::visit`], turning a panic into an errored URL
    async fn visit_guarded<F, Fut>(&self, url: Url, parse: &ParseMode, fetch: F)
    where
        F: FnOnce(Url) -> Fut,
        Fut: Future<Output = Result<String, String>>,
    {
        let outcome = AssertUnwindSafe(self.visit(url.clone(), parse, fetch))
            .catch_unwind()
            .await;

        if outcome.is_err() {
            tracing::error!("Panic while processing {}; recorded as errored", url);
            self.aggregator.record_errored(url.as_str());
        }
    }

    /// Records a parsed page and, in discovery mode, enqueues its links
    fn absorb(&self, url: &Url, parsed: ParsedPage) {
        if self.mode == CrawlMode::Discovery {
            let added = self.frontier.extend(normalized_links(&parsed));
            if added > 0 {
                tracing::trace!("{} new links from {}", added, url);
            }
        }

        if parsed.cleaned_text.is_empty() {
            tracing::debug!("No text on {}", url);
            return;
        }

        self.aggregator.record_page(PageRecord {
            url: url.to_string(),
            heading: parsed.title.unwrap_or_else(|| last_path_segment(url)),
            raw_text: parsed.raw_text,
            cleaned_text: parsed.cleaned_text,
        });
    }

    fn tick(&self) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % self.progress_interval == 0 {
            let (pages, skipped, errored) = self.aggregator.counts();
            tracing::info!(
                "Progress: {} processed ({} pages, {} skipped, {} errored, {} pending, {} seen)",
                processed,
                pages,
                skipped,
                errored,
                self.frontier.unfinished(),
                self.frontier.seen_count()
            );
        }
    }
}

/// Fetches a page over HTTP, returning its body or the failure reason
async fn fetch_http(fetcher: &HttpFetcher, url: Url) -> Result<String, String> {
    match fetcher.get(&url).await {
        FetchOutcome::Success {
            final_url, body, ..
        } => {
            if final_url != url {
                tracing::debug!("{} redirected to {}", url, final_url);
            }
            Ok(String::from_utf8_lossy(&body).into_owned())
        }
        FetchOutcome::Failure {
            error, attempts, ..
        } => Err(format!("{} after {} attempts", error, attempts)),
    }
}

/// Worker loop for the parallel model
async fn parallel_worker(id: usize, state: Arc<CrawlState>, fetcher: Arc<HttpFetcher>) {
    loop {
        match state.frontier.next().await {
            Job::Stop => break,
            Job::Visit(url) => {
                tracing::debug!("Worker {} processing {}", id, url);
                state
                    .visit_guarded(url, &ParseMode::Inline, |url| fetch_http(&fetcher, url))
                    .await;
                state.frontier.task_done();
            }
        }
    }
    tracing::trace!("Worker {} stopped", id);
}

/// Worker loop for the cooperative model
async fn cooperative_worker(
    id: usize,
    state: &CrawlState,
    fetcher: &HttpFetcher,
    parse: &ParseMode,
    idle_poll: Duration,
) {
    loop {
        match tokio::time::timeout(idle_poll, state.frontier.next()).await {
            Ok(Job::Stop) => break,
            Ok(Job::Visit(url)) => {
                tracing::debug!("Worker {} processing {}", id, url);
                state
                    .visit_guarded(url, parse, |url| fetch_http(fetcher, url))
                    .await;
                state.frontier.task_done();
            }
            Err(_) => {
                if state.frontier.is_drained() {
                    break;
                }
            }
        }
    }
    tracing::trace!("Worker {} stopped", id);
}

/// Main crawler coordinator structure
///
/// Generic over the browser launcher so tests can substitute a fake
/// browser; production code uses [`ChromeLauncher`].
pub struct Coordinator<L: BrowserLauncher = ChromeLauncher> {
    config: Config,
    launcher: L,
    fetcher: Arc<HttpFetcher>,
}

impl Coordinator<ChromeLauncher> {
    /// Creates a coordinator that renders dynamic sites with Chromium
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Invalid configuration or HTTP client failure
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        Self::with_launcher(config, ChromeLauncher)
    }
}

impl<L: BrowserLauncher> Coordinator<L> {
    /// Creates a coordinator with a custom browser launcher
    pub fn with_launcher(config: Config, launcher: L) -> Result<Self, HarvestError> {
        crate::config::validate(&config)?;
        let fetcher = HttpFetcher::new(&config.http, config.crawler.timeout())?;

        Ok(Self {
            config,
            launcher,
            fetcher: Arc::new(fetcher),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves robots.txt sitemaps and expands them into seed URLs
    pub async fn plan(&self, origin: &Url) -> SeedPlan {
        let sitemaps = resolve_sitemaps(&self.fetcher, origin).await;

        let mut seeds = BTreeSet::new();
        for sitemap in &sitemaps {
            let urls =
                expand_sitemap(&self.fetcher, sitemap, self.config.crawler.max_sitemap_depth).await;
            seeds.extend(urls);
        }

        if !sitemaps.is_empty() && seeds.is_empty() {
            tracing::warn!("Sitemaps listed no pages; falling back to link discovery");
        }

        SeedPlan {
            origin: origin.clone(),
            sitemaps,
            seeds,
        }
    }

    /// Crawls a site and persists the result
    ///
    /// # Crawl Flow
    ///
    /// 1. Normalize the origin (failure is fatal)
    /// 2. Resolve and expand sitemaps
    /// 3. With sitemap seeds: fetch each seed once over HTTP (flat mode)
    /// 4. Without: classify the site, then crawl from the origin page with
    ///    the HTTP worker pool or the browser loop (discovery mode)
    /// 5. Persist through the configured sink
    ///
    /// Individual URL failures never abort the crawl; they are collected in
    /// the result's errored URL list.
    ///
    /// # Arguments
    ///
    /// * `origin` - The site to crawl
    /// * `name` - Output directory name; derived from the origin when `None`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - Crawl completed
    /// * `Err(HarvestError)` - Invalid origin, unreachable origin page, or
    ///   output failure
    pub async fn crawl(&self, origin: &str, name: Option<&str>) -> Result<CrawlResult, HarvestError> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let origin = normalize_url(origin)?;
        let output_name = name
            .map(sanitize_output_name)
            .unwrap_or_else(|| output_name_for(&origin));
        tracing::info!("Starting crawl of {} (output: {})", origin, output_name);

        let plan = self.plan(&origin).await;
        let mode = plan.mode();
        let state = Arc::new(CrawlState::new(mode, self.config.crawler.progress_interval));

        let strategy = match mode {
            CrawlMode::Flat => {
                tracing::info!("Flat mode: {} URLs from sitemaps", plan.seeds.len());
                state.frontier.extend(plan.seeds);
                self.drain_pool(&state).await;
                FetchStrategy::Http
            }
            CrawlMode::Discovery => {
                let options = LaunchOptions::from_config(&self.config.browser, PageLoad::Eager);
                let dynamic = is_dynamic(
                    &self.fetcher,
                    &self.launcher,
                    &options,
                    &origin,
                    self.config.crawler.timeout(),
                    self.config.crawler.dynamic_threshold,
                )
                .await;

                if dynamic {
                    self.drain_with_browser(&state, &origin).await?;
                    FetchStrategy::Browser
                } else {
                    self.seed_from_origin(&state, &origin).await?;
                    self.drain_pool(&state).await;
                    FetchStrategy::Http
                }
            }
        };

        let (pages, skipped, errored) = state.aggregator.counts();
        tracing::info!(
            "Crawl of {} finished in {:.1}s: {} pages, {} skipped documents, {} errored ({} mode, {} fetcher)",
            origin,
            timer.elapsed().as_secs_f64(),
            pages,
            skipped,
            errored,
            mode,
            strategy
        );

        let sink = sink_for(&self.config.output);
        let result = state.aggregator.finalize(
            &output_name,
            sink.as_ref(),
            CrawlInfo {
                origin: origin.to_string(),
                mode,
                strategy,
                started_at,
            },
        )?;

        Ok(result)
    }

    /// Fetches the origin over HTTP, records it and enqueues its links
    async fn seed_from_origin(&self, state: &CrawlState, origin: &Url) -> Result<(), HarvestError> {
        let html = fetch_http(&self.fetcher, origin.clone()).await.map_err(|e| {
            tracing::error!("Origin {} is unreachable: {}", origin, e);
            HarvestError::OriginUnreachable {
                url: origin.to_string(),
            }
        })?;

        state.frontier.mark_seen(origin);
        state.absorb(origin, parse_html(&html, origin));
        state.tick();
        Ok(())
    }

    /// Drains the frontier with the configured execution model
    async fn drain_pool(&self, state: &Arc<CrawlState>) {
        let workers = self.config.crawler.max_workers;
        tracing::info!(
            "Draining {} URLs with {} {:?} workers",
            state.frontier.unfinished(),
            workers,
            self.config.crawler.execution
        );

        match self.config.crawler.execution {
            Execution::Parallel => self.drain_parallel(state, workers).await,
            Execution::Cooperative => self.drain_cooperative(state, workers).await,
        }
    }

    /// Spawns one runtime task per worker
    async fn drain_parallel(&self, state: &Arc<CrawlState>, workers: usize) {
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let state = Arc::clone(state);
                let fetcher = Arc::clone(&self.fetcher);
                tokio::spawn(parallel_worker(id, state, fetcher))
            })
            .collect();

        state.frontier.join().await;
        state.frontier.stop(workers);

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }

    /// Multiplexes every worker on the current task
    async fn drain_cooperative(&self, state: &CrawlState, workers: usize) {
        let parse = ParseMode::Offload(Arc::new(Semaphore::new(workers)));
        let idle_poll = self.config.crawler.idle_poll();

        let pool = futures::future::join_all(
            (0..workers)
                .map(|id| cooperative_worker(id, state, &self.fetcher, &parse, idle_poll)),
        );
        let terminator = async {
            state.frontier.join().await;
            state.frontier.stop(workers);
        };

        tokio::join!(pool, terminator);
    }

    /// Crawls the site sequentially through one browser session
    async fn drain_with_browser(&self, state: &CrawlState, origin: &Url) -> Result<(), HarvestError> {
        let options = LaunchOptions::from_config(&self.config.browser, PageLoad::Normal);
        let guard = BrowserGuard::acquire(&self.launcher, &options).await?;

        let result = self.browser_loop(state, &*guard, origin).await;
        guard.release().await;
        result
    }

    async fn browser_loop<S: BrowserSession>(
        &self,
        state: &CrawlState,
        session: &S,
        origin: &Url,
    ) -> Result<(), HarvestError> {
        let timeout = self.config.browser.render_timeout();
        tracing::info!("Crawling {} with the browser", origin);

        let html = session.page_source(origin, timeout).await.map_err(|e| {
            tracing::error!("Origin {} could not be rendered: {}", origin, e);
            HarvestError::OriginUnreachable {
                url: origin.to_string(),
            }
        })?;

        state.frontier.mark_seen(origin);
        state.absorb(origin, parse_html(&html, origin));
        state.tick();

        while let Some(job) = state.frontier.try_next() {
            let Job::Visit(url) = job else {
                continue;
            };

            state
                .visit_guarded(url, &ParseMode::Inline, move |url| async move {
                    session
                        .page_source(&url, timeout)
                        .await
                        .map_err(|e| e.to_string())
                })
                .await;
            state.frontier.task_done();
        }

        Ok(())
    }
}
