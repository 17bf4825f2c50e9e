//! Sitemap resolution and expansion tests against a mock server

use crate::common::test_config;
use flate2::write::GzEncoder;
use flate2::Compression;
use site_harvest::crawler::HttpFetcher;
use site_harvest::robots::{expand_sitemap, resolve_sitemaps};
use std::io::Write;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    let dir = std::env::temp_dir();
    let config = test_config(&dir);
    HttpFetcher::new(&config.http, config.crawler.timeout()).unwrap()
}

fn urlset(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("  <url><loc>{}</loc></url>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

fn sitemap_index(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("  <sitemap><loc>{}</loc></sitemap>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>",
        entries
    )
}

async fn mount_xml(server: &MockServer, xml_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(xml_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

fn as_strings(urls: impl IntoIterator<Item = Url>) -> Vec<String> {
    urls.into_iter().map(|u| u.to_string()).collect()
}

#[tokio::test]
async fn test_resolve_sitemaps_from_robots() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "User-agent: *\nDisallow: /admin\nSitemap: /sitemap.xml\nsitemap: /news.xml\n",
        ))
        .mount(&server)
        .await;

    let origin = Url::parse(&format!("{}/docs/", base)).unwrap();
    let sitemaps = resolve_sitemaps(&fetcher(), &origin).await;

    assert_eq!(
        as_strings(sitemaps),
        vec![format!("{}/sitemap.xml", base), format!("{}/news.xml", base)]
    );
}

#[tokio::test]
async fn test_missing_robots_yields_no_sitemaps() {
    let server = MockServer::start().await;
    let origin = Url::parse(&server.uri()).unwrap();

    assert!(resolve_sitemaps(&fetcher(), &origin).await.is_empty());
}

#[tokio::test]
async fn test_index_expands_to_all_children() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/posts.xml", base),
            format!("{}/pages.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/posts.xml",
        urlset(&[format!("{}/posts/1", base), format!("{}/posts/2", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/pages.xml",
        urlset(&[format!("{}/about", base), format!("{}/contact", base)]),
    )
    .await;

    let root = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let urls = expand_sitemap(&fetcher(), &root, 3).await;

    assert_eq!(
        as_strings(urls),
        vec![
            format!("{}/about", base),
            format!("{}/contact", base),
            format!("{}/posts/1", base),
            format!("{}/posts/2", base),
        ]
    );
}

#[tokio::test]
async fn test_depth_bound_stops_nested_indexes() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/nested.xml", base),
            format!("{}/leaf.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/nested.xml",
        sitemap_index(&[format!("{}/deep.xml", base)]),
    )
    .await;
    mount_xml(&server, "/leaf.xml", urlset(&[format!("{}/shallow", base)])).await;

    Mock::given(method("GET"))
        .and(path("/deep.xml"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let urls = expand_sitemap(&fetcher(), &root, 1).await;

    assert_eq!(as_strings(urls), vec![format!("{}/shallow", base)]);
}

#[tokio::test]
async fn test_shared_child_is_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/a.xml", base), format!("{}/b.xml", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/a.xml",
        sitemap_index(&[format!("{}/shared.xml", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/b.xml",
        sitemap_index(&[format!("{}/shared.xml", base)]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/shared.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(urlset(&[format!("{}/page", base)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let root = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let urls = expand_sitemap(&fetcher(), &root, 3).await;

    assert_eq!(as_strings(urls), vec![format!("{}/page", base)]);
}

#[tokio::test]
async fn test_gzipped_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(urlset(&[format!("{}/compressed", base)]).as_bytes())
        .unwrap();
    let compressed = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed)
                .insert_header("content-type", "application/x-gzip"),
        )
        .mount(&server)
        .await;

    let root = Url::parse(&format!("{}/sitemap.xml.gz", base)).unwrap();
    let urls = expand_sitemap(&fetcher(), &root, 3).await;

    assert_eq!(as_strings(urls), vec![format!("{}/compressed", base)]);
}

#[tokio::test]
async fn test_broken_children_do_not_stop_expansion() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/garbage.xml", base),
            format!("{}/missing.xml", base),
            format!("{}/good.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/garbage.xml",
        "<urlset><url><loc>never closed".to_string(),
    )
    .await;
    mount_xml(&server, "/good.xml", urlset(&[format!("{}/kept", base)])).await;

    let root = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let urls = expand_sitemap(&fetcher(), &root, 3).await;

    assert_eq!(as_strings(urls), vec![format!("{}/kept", base)]);
}

#[tokio::test]
async fn test_relative_locations_resolve_against_their_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/maps/index.xml",
        sitemap_index(&["pages.xml".to_string()]),
    )
    .await;
    mount_xml(
        &server,
        "/maps/pages.xml",
        format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <url><loc>/about</loc></url>
  <url>
    <loc>team</loc>
    <image:image><image:loc>{}/img/team</image:loc></image:image>
  </url>
</urlset>"#,
            base
        ),
    )
    .await;

    let root = Url::parse(&format!("{}/maps/index.xml", base)).unwrap();
    let urls = expand_sitemap(&fetcher(), &root, 3).await;

    assert_eq!(
        as_strings(urls),
        vec![
            format!("{}/about", base),
            format!("{}/img/team", base),
            format!("{}/maps/team", base),
        ]
    );
}
