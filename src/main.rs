//! Site-Harvest main entry point
//!
//! This is the command-line interface for the Site-Harvest website crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use site_harvest::config::{load_config_or_default, validate, Config, Execution, OutputFormat};
use site_harvest::crawler::{CrawlMode, FetchStrategy};
use site_harvest::{normalize_url, Coordinator, CrawlResult};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Harvest: crawl a website into a corpus of page text
///
/// Site-Harvest seeds from robots.txt sitemaps when a site publishes them,
/// otherwise it discovers pages by following same-origin links. Sites that
/// render their content with JavaScript are crawled through headless
/// Chromium.
#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(version)]
#[command(about = "Crawls a website into a corpus of page text", long_about = None)]
struct Cli {
    /// Website origin to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Output directory name (defaults to the origin's last path segment)
    #[arg(short, long)]
    name: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent fetch workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Worker scheduling model
    #[arg(long, value_enum)]
    execution: Option<ExecutionArg>,

    /// Output encoding
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Base directory for crawl output
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show configuration, sitemaps and seed count without crawling
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExecutionArg {
    Parallel,
    Cooperative,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Sqlite,
}

/// Summary printed to stdout after a crawl
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary<'a> {
    origin: &'a str,
    mode: CrawlMode,
    strategy: FetchStrategy,
    pages: usize,
    skipped_documents: usize,
    errored_urls: usize,
    output_directory: &'a std::path::Path,
    started_at: String,
    finished_at: String,
}

impl<'a> From<&'a CrawlResult> for Summary<'a> {
    fn from(result: &'a CrawlResult) -> Self {
        Self {
            origin: &result.origin,
            mode: result.mode,
            strategy: result.strategy,
            pages: result.pages.len(),
            skipped_documents: result.skipped_document_urls.len(),
            errored_urls: result.errored_urls.len(),
            output_directory: &result.output_directory,
            started_at: result.started_at.to_rfc3339(),
            finished_at: result.finished_at.to_rfc3339(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let coordinator = Coordinator::new(config).context("Failed to initialize crawler")?;

    if cli.dry_run {
        return handle_dry_run(&coordinator, &cli.url).await;
    }

    let result = coordinator
        .crawl(&cli.url, cli.name.as_deref())
        .await
        .with_context(|| format!("Crawl of {} failed", cli.url))?;

    println!("{}", serde_json::to_string_pretty(&Summary::from(&result))?);
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvest=info,warn"),
            1 => EnvFilter::new("site_harvest=debug,info"),
            2 => EnvFilter::new("site_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let mut config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(workers) = cli.workers {
        config.crawler.max_workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.timeout_seconds = timeout;
    }
    if let Some(execution) = cli.execution {
        config.crawler.execution = match execution {
            ExecutionArg::Parallel => Execution::Parallel,
            ExecutionArg::Cooperative => Execution::Cooperative,
        };
    }
    if let Some(format) = cli.format {
        config.output.format = match format {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Sqlite => OutputFormat::Sqlite,
        };
    }
    if let Some(dir) = &cli.output_dir {
        config.output.base_directory = dir.clone();
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: resolves seeds without crawling
async fn handle_dry_run(coordinator: &Coordinator, url: &str) -> anyhow::Result<()> {
    let config = coordinator.config();
    let origin = normalize_url(url).context("Invalid origin URL")?;

    println!("=== Site-Harvest Dry Run ===\n");

    println!("Origin: {}", origin);

    println!("\nCrawler Configuration:");
    println!("  Workers: {} ({:?})", config.crawler.max_workers, config.crawler.execution);
    println!("  Timeout: {}s", config.crawler.timeout_seconds);
    println!("  Max sitemap depth: {}", config.crawler.max_sitemap_depth);
    println!("  Dynamic threshold: {:.2}", config.crawler.dynamic_threshold);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.base_directory.display());
    println!("  Format: {:?}", config.output.format);

    let plan = coordinator.plan(&origin).await;

    println!("\nSitemaps ({}):", plan.sitemaps.len());
    for sitemap in &plan.sitemaps {
        println!("  - {}", sitemap);
    }

    println!("\n✓ Configuration is valid");
    match plan.mode() {
        CrawlMode::Flat => println!(
            "✓ Would fetch {} sitemap URLs (flat mode)",
            plan.seeds.len()
        ),
        CrawlMode::Discovery => {
            println!("✓ No sitemap URLs; would classify the site and discover links from the origin")
        }
    }

    Ok(())
}
