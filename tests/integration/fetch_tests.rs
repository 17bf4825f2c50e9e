//! HTTP fetch retry tests against a mock server

use crate::common::test_config;
use site_harvest::crawler::{FetchOutcome, FetchRequest, HttpFetcher};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    let config = test_config(&std::env::temp_dir());
    HttpFetcher::new(&config.http, config.crawler.timeout()).unwrap()
}

#[tokio::test]
async fn test_succeeds_after_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
    let outcome = fetcher().get(&url).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.text().as_deref(), Some("finally"));
}

#[tokio::test]
async fn test_succeeds_after_three_transport_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stalls"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stalls"))
        .respond_with(ResponseTemplate::new(200).set_body_string("answered"))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/stalls", server.uri())).unwrap();
    let request = FetchRequest::get(url).timeout(Duration::from_millis(100));
    let outcome = fetcher().fetch(&request).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.text().as_deref(), Some("answered"));
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/down", server.uri())).unwrap();
    match fetcher().get(&url).await {
        FetchOutcome::Failure {
            status_code,
            attempts,
            ..
        } => {
            assert_eq!(status_code, Some(500));
            assert_eq!(attempts, 4);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_200_success_codes_are_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/empty", server.uri())).unwrap();
    let outcome = fetcher().get(&url).await;

    assert!(!outcome.is_success());
    assert!(outcome.text().is_none());
}

#[tokio::test]
async fn test_timeout_counts_as_failed_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast now"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    let request = FetchRequest::get(url).timeout(Duration::from_millis(100));
    let outcome = fetcher().fetch(&request).await;

    assert_eq!(outcome.text().as_deref(), Some("fast now"));
}

#[tokio::test]
async fn test_request_builder_sends_params_and_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(body_json(serde_json::json!({ "page": 2 })))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("results"))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/search", server.uri())).unwrap();
    let request = FetchRequest::get(url)
        .method(reqwest::Method::POST)
        .param("q", "rust")
        .json(serde_json::json!({ "page": 2 }));

    let outcome = fetcher().fetch(&request).await;
    assert_eq!(outcome.text().as_deref(), Some("results"));
}
