use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Harvest
///
/// Every section is optional; missing sections and keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// How the worker pool is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    /// Workers are spawned as independent runtime tasks sharing the frontier
    #[default]
    Parallel,
    /// Workers are multiplexed on the calling task; parsing is offloaded
    Cooperative,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Per-request timeout and DOM-ready wait, in seconds
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: u64,

    /// Number of concurrent fetch workers
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Maximum sitemap-index recursion depth
    #[serde(rename = "max-sitemap-depth")]
    pub max_sitemap_depth: u32,

    /// Relative text-length gain above which a site is treated as dynamic
    #[serde(rename = "dynamic-threshold")]
    pub dynamic_threshold: f64,

    /// Worker scheduling model
    pub execution: Execution,

    /// Cooperative workers re-check for drain after this long without work
    #[serde(rename = "idle-poll-ms")]
    pub idle_poll_ms: u64,

    /// Log progress every N processed URLs
    #[serde(rename = "progress-interval")]
    pub progress_interval: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_workers: 10,
            max_sitemap_depth: 3,
            dynamic_threshold: 0.30,
            execution: Execution::Parallel,
            idle_poll_ms: 5000,
            progress_interval: 25,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total attempts per request, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Pause between failed attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// TCP/TLS connect timeout in seconds
    #[serde(rename = "connect-timeout-seconds")]
    pub connect_timeout_seconds: u64,

    /// Skip TLS certificate validation
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,

    /// User-Agent strings rotated across requests
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

/// Browser-like User-Agent strings used when none are configured
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:40.0) Gecko/20100101 Firefox/40.0",
];

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            retry_delay_ms: 250,
            connect_timeout_seconds: 10,
            accept_invalid_certs: true,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl HttpConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Navigation and DOM-ready wait per page during a browser crawl
    #[serde(rename = "render-timeout-seconds")]
    pub render_timeout_seconds: u64,

    /// Explicit Chrome/Chromium binary; auto-detected when absent
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            render_timeout_seconds: 20,
            executable: None,
        }
    }
}

impl BrowserConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_seconds)
    }
}

/// On-disk encoding of crawl output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory under which one sub-directory per crawl is created
    #[serde(rename = "base-directory")]
    pub base_directory: PathBuf,

    /// Encoding of the crawl artifacts
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("documents"),
            format: OutputFormat::Json,
        }
    }
}
