//! End-to-end crawl tests
//!
//! These tests use wiremock to stand in for the crawled site and a fake
//! browser launcher in place of Chromium.

use crate::common::{html_page, test_config, FakeLauncher};
use site_harvest::config::{Execution, OutputFormat};
use site_harvest::crawler::Coordinator;
use site_harvest::output::{ERRORED_FILE, PAGES_FILE, SKIPPED_FILE};
use site_harvest::{CrawlMode, CrawlResult, FetchStrategy, HarvestError, PageRecord};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn page_urls(result: &CrawlResult) -> Vec<String> {
    let mut urls: Vec<String> = result.pages.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_discovery_crawl_follows_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Home", r#"<p>Welcome home</p><a href="/about">About us</a>"#),
    )
    .await;
    mount_page(&server, "/about", html_page("About", "<p>About this site</p>")).await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator =
        Coordinator::with_launcher(test_config(dir.path()), FakeLauncher::unavailable()).unwrap();
    let result = coordinator.crawl(&base, None).await.unwrap();

    assert_eq!(result.mode, CrawlMode::Discovery);
    assert_eq!(result.strategy, FetchStrategy::Http);
    assert_eq!(
        page_urls(&result),
        vec![format!("{}/", base), format!("{}/about", base)]
    );
    assert!(result.errored_urls.is_empty());
    assert!(result.skipped_document_urls.is_empty());

    let about = result
        .pages
        .iter()
        .find(|p| p.url.ends_with("/about"))
        .unwrap();
    assert_eq!(about.heading, "About");
    assert!(about.raw_text.contains("About this site"));
}

#[tokio::test]
async fn test_documents_images_and_failures_are_partitioned() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<p>Reports</p>
            <a href="/about">About</a>
            <a href="/annual-report.pdf">Report</a>
            <a href="/logo.png">Logo</a>
            <a href="/missing">Gone</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/about", html_page("About", "<p>About text</p>")).await;

    Mock::given(method("GET"))
        .and(path("/annual-report.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator =
        Coordinator::with_launcher(test_config(dir.path()), FakeLauncher::unavailable()).unwrap();
    let result = coordinator.crawl(&base, Some("reports")).await.unwrap();

    assert_eq!(
        page_urls(&result),
        vec![format!("{}/", base), format!("{}/about", base)]
    );
    assert_eq!(
        result.skipped_document_urls,
        vec![format!("{}/annual-report.pdf", base)]
    );
    assert_eq!(result.errored_urls, vec![format!("{}/missing", base)]);
    assert_eq!(result.total_urls(), 4);

    assert!(result.output_directory.ends_with("reports"));
    assert!(result.output_directory.join(PAGES_FILE).exists());
    assert!(result.output_directory.join(SKIPPED_FILE).exists());
    assert!(result.output_directory.join(ERRORED_FILE).exists());

    let written = std::fs::read_to_string(result.output_directory.join(PAGES_FILE)).unwrap();
    let pages: Vec<PageRecord> = serde_json::from_str(&written).unwrap();
    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn test_flat_crawl_from_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nSitemap: {}/sitemap.xml\n", base)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{0}/a</loc></url>
  <url><loc>{0}/b</loc></url>
</urlset>"#,
            base
        )))
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/a",
        html_page("A", r#"<p>Page A</p><a href="/unlisted">Unlisted</a>"#),
    )
    .await;
    mount_page(&server, "/b", html_page("B", "<p>Page B</p>")).await;

    // Flat mode never follows links found on sitemap pages
    Mock::given(method("GET"))
        .and(path("/unlisted"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator =
        Coordinator::with_launcher(test_config(dir.path()), FakeLauncher::unavailable()).unwrap();
    let result = coordinator.crawl(&base, None).await.unwrap();

    assert_eq!(result.mode, CrawlMode::Flat);
    assert_eq!(result.strategy, FetchStrategy::Http);
    assert_eq!(
        page_urls(&result),
        vec![format!("{}/a", base), format!("{}/b", base)]
    );
    assert!(result.errored_urls.is_empty());
}

#[tokio::test]
async fn test_cooperative_execution() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<p>Index</p><a href="/one">One</a><a href="/two">Two</a>"#,
        ),
    )
    .await;
    mount_page(
        &server,
        "/one",
        html_page("One", r#"<p>First</p><a href="/three">Three</a>"#),
    )
    .await;
    mount_page(&server, "/two", html_page("Two", "<p>Second</p>")).await;
    mount_page(&server, "/three", html_page("Three", "<p>Third</p>")).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.execution = Execution::Cooperative;
    config.crawler.max_workers = 3;

    let coordinator = Coordinator::with_launcher(config, FakeLauncher::unavailable()).unwrap();
    let result = coordinator.crawl(&base, None).await.unwrap();

    assert_eq!(
        page_urls(&result),
        vec![
            format!("{}/", base),
            format!("{}/one", base),
            format!("{}/three", base),
            format!("{}/two", base),
        ]
    );
    assert!(result.errored_urls.is_empty());
}

#[tokio::test]
async fn test_dynamic_site_uses_browser() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("App", "<div id=\"root\">Loading</div>")).await;

    let launcher = FakeLauncher::serving(&[
        (
            "/",
            html_page(
                "App",
                r#"<div id="root"><h1>Rendered application shell</h1>
                <p>Everything on this page was produced by client-side scripts.</p>
                <a href="/docs">Documentation</a></div>"#,
            ),
        ),
        (
            "/docs",
            html_page("Docs", "<p>Rendered documentation body</p>"),
        ),
    ]);
    let counter = std::sync::Arc::clone(&launcher.counter);

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::with_launcher(test_config(dir.path()), launcher).unwrap();
    let result = coordinator.crawl(&base, None).await.unwrap();

    assert_eq!(result.mode, CrawlMode::Discovery);
    assert_eq!(result.strategy, FetchStrategy::Browser);
    assert_eq!(
        page_urls(&result),
        vec![format!("{}/", base), format!("{}/docs", base)]
    );

    // One session for classification, one for the crawl
    assert_eq!(counter.launched(), 2);
    assert_eq!(counter.released(), 2);
}

#[tokio::test]
async fn test_unreachable_origin_is_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let launcher = FakeLauncher::serving(&[("/elsewhere", html_page("x", "<p>x</p>"))]);
    let counter = std::sync::Arc::clone(&launcher.counter);

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::with_launcher(test_config(dir.path()), launcher).unwrap();
    let err = coordinator.crawl(&base, None).await.unwrap_err();

    assert!(matches!(err, HarvestError::OriginUnreachable { .. }));
    assert_eq!(counter.launched(), 1);
    assert_eq!(counter.released(), 1);
}

#[tokio::test]
async fn test_invalid_origin_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator =
        Coordinator::with_launcher(test_config(dir.path()), FakeLauncher::unavailable()).unwrap();

    let err = coordinator.crawl("https://", None).await.unwrap_err();
    assert!(matches!(err, HarvestError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_sqlite_output() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", "<p>Stored in a database</p>")).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.output.format = OutputFormat::Sqlite;

    let coordinator = Coordinator::with_launcher(config, FakeLauncher::unavailable()).unwrap();
    let result = coordinator.crawl(&base, Some("db")).await.unwrap();

    let db = result
        .output_directory
        .join(site_harvest::output::DATABASE_FILE);
    let conn = rusqlite::Connection::open(db).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
