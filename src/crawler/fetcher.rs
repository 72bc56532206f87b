//! HTTP fetcher implementation
//!
//! This module handles all network access for a crawl unit, including:
//! - Building HTTP clients with a browser-like user agent
//! - HEAD requests to check status and Content-Type before fetching
//! - GET requests to fetch page content
//! - Retry with exponential backoff for transient failures
//! - The headless-render fallback for script-built pages
//! - Randomized think time between requests

use crate::config::HttpConfig;
use crate::crawler::render::Renderer;
use crate::crawler::unit::{CrawlUnit, RetryPolicy};
use crate::HarvestError;
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of fetching one page
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Page bytes; None when the page was skipped
    pub content: Option<Vec<u8>>,

    /// Response headers of the last request made
    pub headers: HashMap<String, String>,

    /// HTTP status code of the last request made
    pub status_code: u16,

    /// URL the content was served from after redirects
    pub final_url: Option<String>,
}

impl FetchResult {
    /// Returns true if there is nothing to parse
    pub fn is_empty(&self) -> bool {
        self.content.as_ref().map_or(true, |c| c.is_empty())
    }
}

/// Network access for one crawl unit
///
/// A fetcher owns its HTTP client and its headless browser. Each worker
/// builds its own fetcher per unit, so neither is shared across units.
pub struct Fetcher {
    client: Client,
    user_agent: String,
    retry: RetryPolicy,
    think_time: Duration,
    renderer: Renderer,
}

impl Fetcher {
    /// Creates a fetcher with the given retry policy and think time
    ///
    /// # Arguments
    ///
    /// * `config` - HTTP client settings
    /// * `retry` - Backoff policy for HEAD/GET
    /// * `think_time` - Upper bound of the random pause before transfers
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready to fetch
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(
        config: &HttpConfig,
        retry: RetryPolicy,
        think_time: Duration,
    ) -> Result<Self, HarvestError> {
        let user_agent = random_agent(&config.user_agents);
        let client = build_http_client(config, &user_agent)?;

        Ok(Self {
            client,
            renderer: Renderer::new(user_agent.clone()),
            user_agent,
            retry,
            think_time,
        })
    }

    /// Creates a fetcher configured for a crawl unit
    pub fn for_unit(config: &HttpConfig, unit: &CrawlUnit) -> Result<Self, HarvestError> {
        Self::new(config, unit.retry, unit.think_time)
    }

    /// The user agent this fetcher sends
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetches a page
    ///
    /// # Request Flow
    ///
    /// **render = true:** load the page in the headless browser and return
    /// its serialized DOM.
    ///
    /// **render = false:**
    /// 1. HEAD the URL; any status other than 200 skips the page
    /// 2. Skip unless Content-Type is HTML
    /// 3. Pause for a random think time
    /// 4. GET and return the body
    ///
    /// Skips are not errors: they return an empty [`FetchResult`].
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - Page content, or empty when skipped
    /// * `Err(HarvestError)` - Network failure after retries, or render failure
    pub async fn fetch(&self, url: &str, render: bool) -> Result<FetchResult, HarvestError> {
        tracing::info!("Fetching page: {}", url);

        if render {
            let html = self.renderer.render(url).await?;
            return Ok(FetchResult {
                content: Some(html.into_bytes()),
                headers: HashMap::new(),
                status_code: StatusCode::OK.as_u16(),
                final_url: Some(url.to_string()),
            });
        }

        let head = self.head(url).await?;
        let status = head.status();
        let headers = header_map(head.headers());

        if status != StatusCode::OK {
            tracing::info!("Ignored url: {} ; status_code={}", url, status.as_u16());
            return Ok(FetchResult {
                content: None,
                headers,
                status_code: status.as_u16(),
                final_url: None,
            });
        }

        if !is_html(head.headers()) {
            tracing::debug!("Not an HTML page, skipping: {}", url);
            return Ok(FetchResult {
                content: None,
                headers,
                status_code: status.as_u16(),
                final_url: None,
            });
        }

        think(self.think_time).await;

        let response = self.get(url).await?;
        let status_code = response.status().as_u16();
        let headers = header_map(response.headers());
        let final_url = response.url().to_string();
        if final_url != url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }
        let body = response.bytes().await.map_err(|e| HarvestError::Http {
            url: url.to_string(),
            source: e,
        })?;

        Ok(FetchResult {
            content: Some(body.to_vec()),
            headers,
            status_code,
            final_url: Some(final_url),
        })
    }

    /// Sends a HEAD request with retry
    pub async fn head(&self, url: &str) -> Result<Response, HarvestError> {
        self.send_with_retry(Method::HEAD, url).await
    }

    /// Sends a GET request with retry
    pub async fn get(&self, url: &str) -> Result<Response, HarvestError> {
        self.send_with_retry(Method::GET, url).await
    }

    /// Pauses for a random duration bounded by this fetcher's think time
    pub async fn think(&self) {
        think(self.think_time).await;
    }

    /// Closes the headless browser if it was started
    pub async fn shutdown(&self) {
        self.renderer.shutdown().await;
    }

    /// Sends a request, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 429, 500, 502, 503, 504 | Retry with backoff |
    /// | Timeout / connection error | Retry with backoff |
    /// | Any other response | Return it |
    /// | Retries exhausted | `HarvestError::Network` |
    async fn send_with_retry(&self, method: Method, url: &str) -> Result<Response, HarvestError> {
        let mut attempt = 0u32;

        loop {
            let result = self.client.request(method.clone(), url).send().await;

            let failure = match result {
                Ok(response) if RetryPolicy::is_retryable(response.status()) => {
                    format!("HTTP {}", response.status().as_u16())
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => e.to_string(),
                Err(e) => {
                    return Err(HarvestError::Network {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })
                }
            };

            if attempt >= self.retry.retries {
                return Err(HarvestError::Network {
                    url: url.to_string(),
                    reason: format!(
                        "{} {} failed after {} retries: {}",
                        method, url, self.retry.retries, failure
                    ),
                });
            }

            attempt += 1;
            let delay = self.retry.delay(attempt);
            tracing::warn!(
                "{} {} failed ({}), retry {}/{} in {:?}",
                method,
                url,
                failure,
                attempt,
                self.retry.retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builds an HTTP client with the given user agent
///
/// Redirects are followed (up to 10 hops) so that assets served behind a
/// redirect are downloaded from their final location.
pub fn build_http_client(config: &HttpConfig, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sleeps for a whole number of seconds drawn uniformly from `[0, bound]`
pub async fn think(bound: Duration) {
    let bound = bound.as_secs();
    if bound == 0 {
        return;
    }
    let secs = rand::rng().random_range(0..=bound);
    tracing::trace!("Thinking for {}s", secs);
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Picks one user agent at random, skipping blank entries
fn random_agent(agents: &[String]) -> String {
    let candidates: Vec<&String> = agents.iter().filter(|a| !a.trim().is_empty()).collect();
    candidates
        .choose(&mut rand::rng())
        .map(|agent| agent.to_string())
        .unwrap_or_else(|| format!("asset-harvester/{}", env!("CARGO_PKG_VERSION")))
}

/// Returns true when the Content-Type header names an HTML document
fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Snapshots response headers as strings, dropping non-UTF-8 values
pub fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
