//! Integration tests for the harvester
//!
//! These tests use wiremock to serve pages and assets and exercise traversal,
//! downloading and dispatching end-to-end.

mod dispatch_tests;
mod traversal_tests;

use asset_harvester::config::HttpConfig;
use asset_harvester::crawler::{Fetcher, RetryPolicy};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher with no think time and the given retry policy
pub fn test_fetcher(retry: RetryPolicy) -> Fetcher {
    Fetcher::new(&HttpConfig::default(), retry, Duration::ZERO).expect("fetcher")
}

/// Serves `html` at `route` for both HEAD and GET
pub async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.as_bytes().to_vec(), "text/html"))
        .mount(server)
        .await;
}

/// Serves a `len`-byte asset at `route` for both HEAD and GET
pub async fn mount_asset(server: &MockServer, route: &str, mime: &str, len: usize) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; len], mime))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; len], mime))
        .mount(server)
        .await;
}

/// Paths of every request the server has received
pub async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}
