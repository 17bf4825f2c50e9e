//! HTTP fetcher implementation
//!
//! This module handles all plain HTTP requests for the crawler, including:
//! - Building the shared HTTP client with browser-like default headers
//! - Rotating User-Agent strings across requests
//! - Retrying failed requests a bounded number of times
//! - Reporting failures as values instead of errors

use crate::config::HttpConfig;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// A single HTTP request description
///
/// Built with [`FetchRequest::get`] and refined with the builder methods.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub timeout: Option<Duration>,
    pub params: Vec<(String, String)>,
    pub payload: Option<serde_json::Value>,
}

impl FetchRequest {
    /// Creates a GET request for the given URL
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            timeout: None,
            params: Vec::new(),
            payload: None,
        }
    }

    /// Sets the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Overrides the fetcher's default timeout for this request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a query-string parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Sets a JSON request body
    pub fn json(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered 200
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value, empty when absent
        content_type: String,
        /// Raw response body
        body: Vec<u8>,
    },

    /// Every attempt failed
    Failure {
        /// Status of the last response, if the server answered at all
        status_code: Option<u16>,
        /// Description of the last failure
        error: String,
        /// Number of attempts made
        attempts: u32,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the body decoded as UTF-8 (lossily), or None on failure
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(String::from_utf8_lossy(body).into_owned()),
            Self::Failure { .. } => None,
        }
    }
}

/// Shared HTTP client with retry and User-Agent rotation
///
/// One fetcher is built per crawl and shared by every worker.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
    max_attempts: u32,
    retry_delay: Duration,
    default_timeout: Duration,
}

impl HttpFetcher {
    /// Builds a fetcher from the HTTP configuration
    ///
    /// # Arguments
    ///
    /// * `config` - HTTP client settings (attempts, agents, TLS)
    /// * `default_timeout` - Timeout applied to requests that do not set one
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Successfully built fetcher
    /// * `Err(reqwest::Error)` - Failed to build the underlying client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use site_harvest::config::HttpConfig;
    /// use site_harvest::crawler::HttpFetcher;
    /// use std::time::Duration;
    ///
    /// let fetcher = HttpFetcher::new(&HttpConfig::default(), Duration::from_secs(10)).unwrap();
    /// ```
    pub fn new(config: &HttpConfig, default_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .default_headers(default_headers())
            .connect_timeout(config.connect_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
            next_agent: AtomicUsize::new(0),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            default_timeout,
        })
    }

    /// Fetches a URL with a plain GET and the default timeout
    pub async fn get(&self, url: &Url) -> FetchOutcome {
        self.fetch(&FetchRequest::get(url.clone())).await
    }

    /// Performs a request, retrying until a 200 arrives or attempts run out
    ///
    /// Any status other than 200 counts as a failed attempt, as do transport
    /// errors and timeouts. Every failed attempt is logged. The fetcher never
    /// returns an error; exhausted retries produce [`FetchOutcome::Failure`].
    ///
    /// # Arguments
    ///
    /// * `request` - The request to perform
    ///
    /// # Returns
    ///
    /// A FetchOutcome carrying either the body or the last failure
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let mut last_status = None;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.attempt(request).await {
                Ok(outcome) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", request.url, attempt);
                    }
                    return outcome;
                }
                Err((status, error)) => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt,
                        self.max_attempts,
                        request.url,
                        error
                    );
                    last_status = status;
                    last_error = error;
                }
            }

            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        FetchOutcome::Failure {
            status_code: last_status,
            error: last_error,
            attempts: self.max_attempts,
        }
    }

    /// Performs a single attempt
    async fn attempt(&self, request: &FetchRequest) -> Result<FetchOutcome, (Option<u16>, String)> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(request.timeout.unwrap_or(self.default_timeout))
            .header(header::USER_AGENT, self.next_user_agent());

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| (None, describe_error(&e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err((Some(status.as_u16()), format!("HTTP {}", status)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| (Some(status.as_u16()), describe_error(&e)))?;

        Ok(FetchOutcome::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }

    /// Returns the next User-Agent in round-robin order
    fn next_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return "";
        }
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }
}

/// Headers a desktop browser would send
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Classifies a transport error into a short description
fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
