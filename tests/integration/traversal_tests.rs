//! Traversal tests: depth bounds, visited handling and link collection

use crate::{mount_page, requested_paths, test_fetcher};
use asset_harvester::crawler::{
    crawl_page, crawl_targets, AssetLinkSet, CrawlUnit, RetryPolicy, VisitedSet,
};
use asset_harvester::PatternSet;
use asset_harvester::config::HttpConfig;
use asset_harvester::crawler::Fetcher;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn two_page_site() -> MockServer {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a",
        r#"<html><body><img src="/i.png"><a href="/b">b</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/b",
        r#"<html><body><img src="/j.png"><a href="/a">back</a></body></html>"#,
    )
    .await;
    server
}

#[tokio::test]
async fn test_follows_links_to_max_depth() {
    let server = two_page_site().await;
    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/a", base)]).with_max_depth(1);

    let mut visited = VisitedSet::new();
    let mut assets = AssetLinkSet::new();
    let start = format!("{}/a", base);
    crawl_page(&fetcher, &unit, &start, &mut visited, &mut assets, 0).await;

    let expected: AssetLinkSet = [format!("{}/i.png", base), format!("{}/j.png", base)]
        .into_iter()
        .collect();
    assert_eq!(assets, expected);

    let expected_visited: VisitedSet = [format!("{}/a", base), format!("{}/b", base)]
        .into_iter()
        .collect();
    assert_eq!(visited, expected_visited);
}

#[tokio::test]
async fn test_depth_zero_fetches_only_the_target() {
    let server = two_page_site().await;
    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/a", base)]).with_max_depth(0);

    let assets = crawl_targets(&fetcher, &unit).await;

    assert_eq!(assets.into_iter().collect::<Vec<_>>(), vec![format!("{}/i.png", base)]);
    assert!(!requested_paths(&server).await.iter().any(|p| p == "/b"));
}

#[tokio::test]
async fn test_each_page_fetched_once_per_traversal() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a",
        r#"<a href="/b">1</a><a href="/b">2</a><a href="/a">self</a><img src="/i.png">"#,
    )
    .await;
    mount_page(&server, "/b", r#"<a href="/a">a</a><img src="/i.png">"#).await;

    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/a", base)]).with_max_depth(3);

    let assets = crawl_targets(&fetcher, &unit).await;
    assert_eq!(assets.len(), 1);

    let gets: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.to_string() == "GET")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(gets.iter().filter(|p| *p == "/a").count(), 1);
    assert_eq!(gets.iter().filter(|p| *p == "/b").count(), 1);
}

#[tokio::test]
async fn test_terminal_documents_are_never_fetched() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a",
        r#"<a href="/report.PDF">pdf</a><a href="/poster.jpg">jpg</a><img src="/i.png">"#,
    )
    .await;

    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/a", base)]).with_max_depth(2);

    let assets = crawl_targets(&fetcher, &unit).await;
    assert_eq!(assets.len(), 1);

    let paths = requested_paths(&server).await;
    assert!(!paths.iter().any(|p| p == "/report.PDF" || p == "/poster.jpg"));
}

#[tokio::test]
async fn test_ignore_and_follow_patterns() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a",
        r#"<img src="/logo.png"><img src="/i.png">
           <a href="/wanted/ecap/1">keep</a><a href="/news">skip</a>"#,
    )
    .await;
    mount_page(&server, "/wanted/ecap/1", r#"<img src="/k.png">"#).await;

    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/a", base)])
        .with_ignore(PatternSet::new(["logo.png"]))
        .with_follow(PatternSet::new(["wanted/ecap"]));

    let assets = crawl_targets(&fetcher, &unit).await;

    let expected: AssetLinkSet = [format!("{}/i.png", base), format!("{}/k.png", base)]
        .into_iter()
        .collect();
    assert_eq!(assets, expected);
    assert!(!requested_paths(&server).await.iter().any(|p| p == "/news"));
}

#[tokio::test]
async fn test_non_html_and_missing_pages_are_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", r#"<a href="/feed">f</a><a href="/gone">g</a>"#).await;

    Mock::given(method("HEAD"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/a", base)]);

    let mut visited = VisitedSet::new();
    let mut assets = AssetLinkSet::new();
    let start = format!("{}/a", base);
    crawl_page(&fetcher, &unit, &start, &mut visited, &mut assets, 0).await;

    assert!(assets.is_empty());
    assert!(visited.contains(&format!("{}/feed", base)));
    assert!(visited.contains(&format!("{}/gone", base)));
}

#[tokio::test]
async fn test_unreachable_target_does_not_stop_other_targets() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", r#"<img src="/i.png">"#).await;
    Mock::given(method("HEAD"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy {
        retries: 1,
        backoff_factor: 0.0,
    });
    let unit = CrawlUnit::new("site", [format!("{}/down", base), format!("{}/a", base)]);

    let assets = crawl_targets(&fetcher, &unit).await;
    assert!(assets.contains(&format!("{}/i.png", base)));
}

#[tokio::test]
async fn test_fetch_retries_transient_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", r#"<img src="/i.png">"#).await;

    let fetcher = test_fetcher(RetryPolicy {
        retries: 2,
        backoff_factor: 0.0,
    });
    let result = fetcher
        .fetch(&format!("{}/a", server.uri()), false)
        .await
        .unwrap();

    assert_eq!(result.status_code, 200);
    assert!(!result.is_empty());
}

#[tokio::test]
async fn test_fetch_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(RetryPolicy {
        retries: 2,
        backoff_factor: 0.0,
    });
    let err = fetcher
        .fetch(&format!("{}/a", server.uri()), false)
        .await
        .unwrap_err();

    assert!(matches!(err, asset_harvester::HarvestError::Network { .. }));
}

#[tokio::test]
async fn test_fetch_head_not_ok_skips_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(RetryPolicy::none());
    let result = fetcher
        .fetch(&format!("{}/a", server.uri()), false)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.status_code, 404);
}

fn get_count(requests: &[wiremock::Request], route: &str) -> usize {
    requests
        .iter()
        .filter(|r| r.method.to_string() == "GET" && r.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_links_resolve_against_redirected_location() {
    let server = MockServer::start().await;
    Mock::given(path("/gallery"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/gallery/"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/gallery/",
        r#"<img src="photo.png"><a href="more">more</a>"#,
    )
    .await;
    mount_page(&server, "/gallery/more", r#"<img src="/top.png">"#).await;

    let base = server.uri();
    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/gallery", base)]).with_max_depth(1);

    let mut visited = VisitedSet::new();
    let mut assets = AssetLinkSet::new();
    let start = format!("{}/gallery", base);
    crawl_page(&fetcher, &unit, &start, &mut visited, &mut assets, 0).await;

    let expected: AssetLinkSet = [
        format!("{}/gallery/photo.png", base),
        format!("{}/top.png", base),
    ]
    .into_iter()
    .collect();
    assert_eq!(assets, expected);
    assert!(visited.contains(&format!("{}/gallery", base)));
    assert!(visited.contains(&format!("{}/gallery/", base)));
}

#[tokio::test]
async fn test_redirected_page_is_not_fetched_again() {
    let server = MockServer::start().await;
    Mock::given(path("/gallery"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/gallery/"))
        .mount(&server)
        .await;
    mount_page(&server, "/gallery/", r#"<a href="/gallery/">self</a><img src="i.png">"#).await;

    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [format!("{}/gallery", server.uri())]).with_max_depth(2);

    crawl_targets(&fetcher, &unit).await;

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(get_count(&requests, "/gallery/"), 1);
}

#[tokio::test]
async fn test_bare_host_target_matches_root_link() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/">home</a><img src="/i.png">"#).await;

    let fetcher = test_fetcher(RetryPolicy::none());
    let unit = CrawlUnit::new("site", [server.uri()]).with_max_depth(1);
    assert!(!server.uri().ends_with('/'));

    let assets = crawl_targets(&fetcher, &unit).await;
    assert_eq!(assets.len(), 1);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(get_count(&requests, "/"), 1);
}

#[tokio::test]
async fn test_requests_carry_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a"))
        .and(header("user-agent", "TestAgent/1.0"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .and(header("user-agent", "TestAgent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"<p>hi</p>".to_vec(), "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpConfig {
        user_agents: vec!["TestAgent/1.0".to_string()],
        ..HttpConfig::default()
    };
    let fetcher = Fetcher::new(&config, RetryPolicy::none(), Duration::ZERO).unwrap();
    assert_eq!(fetcher.user_agent(), "TestAgent/1.0");

    let result = fetcher
        .fetch(&format!("{}/a", server.uri()), false)
        .await
        .unwrap();
    assert_eq!(result.status_code, 200);
    assert_eq!(result.final_url, Some(format!("{}/a", server.uri())));
}
