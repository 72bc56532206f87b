//! Dispatcher tests: unit isolation and outcome aggregation

use crate::{mount_asset, mount_page};
use asset_harvester::config::{HttpConfig, UnitConfig};
use asset_harvester::crawler::Dispatcher;
use tempfile::TempDir;
use wiremock::MockServer;

fn unit_config(name: &str, targets: Vec<String>) -> UnitConfig {
    UnitConfig {
        name: name.to_string(),
        targets,
        max_depth: 1,
        think_time: 0,
        http_retries: 0,
        retry_backoff: 0.0,
        ..UnitConfig::default()
    }
}

#[tokio::test]
async fn test_bad_unit_does_not_affect_good_unit() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a",
        r#"<img src="/i.png"><img src="/missing.png"><a href="/b">b</a>"#,
    )
    .await;
    mount_page(&server, "/b", r#"<img src="/j.png">"#).await;
    mount_asset(&server, "/i.png", "image/png", 30).await;
    mount_asset(&server, "/j.png", "image/png", 40).await;

    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(HttpConfig::default(), dir.path(), 2);

    let good = unit_config("good", vec![format!("{}/a", base)]);
    let bad = unit_config("bad", vec!["ftp://nowhere/".to_string()]);

    let summary = dispatcher.run_configs(&[bad, good]).await;
    assert_eq!(summary.outcomes.len(), 2);

    let bad = summary.outcome("bad").unwrap();
    assert_eq!(bad.files_downloaded, 0);
    assert_eq!(bad.error_count(), 1);

    let good = summary.outcome("good").unwrap();
    assert_eq!(good.images_found, 3);
    assert_eq!(good.files_downloaded, 2);
    assert_eq!(good.error_count(), 1);
    assert_eq!(good.errors[0].0, format!("{}/missing.png", base));
}

#[tokio::test]
async fn test_rerun_reports_cached_assets() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", r#"<img src="/i.png">"#).await;
    mount_asset(&server, "/i.png", "image/png", 30).await;

    let dir = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(HttpConfig::default(), dir.path(), 1);
    let units = vec![unit_config("site", vec![format!("{}/a", server.uri())])];

    let first = dispatcher.run_configs(&units).await;
    assert_eq!(first.total_downloaded(), 1);

    let second = dispatcher.run_configs(&units).await;
    assert_eq!(second.total_downloaded(), 0);
    assert_eq!(second.total_cached(), 1);
}

#[tokio::test]
async fn test_more_units_than_workers() {
    let server = MockServer::start().await;
    for n in 0..4 {
        mount_page(&server, &format!("/p{}", n), &format!(r#"<img src="/i{}.png">"#, n)).await;
        mount_asset(&server, &format!("/i{}.png", n), "image/png", 10).await;
    }

    let dir = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(HttpConfig::default(), dir.path(), 2);
    let units: Vec<UnitConfig> = (0..4)
        .map(|n| unit_config(&format!("u{}", n), vec![format!("{}/p{}", server.uri(), n)]))
        .collect();

    let summary = dispatcher.run_configs(&units).await;
    assert_eq!(summary.outcomes.len(), 4);
    assert_eq!(summary.total_downloaded(), 4);
    assert_eq!(summary.total_errors(), 0);
}

#[tokio::test]
async fn test_out_of_range_backoff_is_rejected_and_run_continues() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", r#"<img src="/i.png">"#).await;
    mount_asset(&server, "/i.png", "image/png", 30).await;

    let dir = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(HttpConfig::default(), dir.path(), 1);

    let mut runaway = unit_config("runaway", vec![format!("{}/a", server.uri())]);
    runaway.retry_backoff = 1e20;
    runaway.http_retries = 3;
    let healthy = unit_config("healthy", vec![format!("{}/a", server.uri())]);

    let summary = dispatcher.run_configs(&[runaway, healthy]).await;
    assert_eq!(summary.outcomes.len(), 2);

    let runaway = summary.outcome("runaway").unwrap();
    assert_eq!(runaway.error_count(), 1);
    assert!(runaway.errors[0].1.contains("retry-backoff"));

    let healthy = summary.outcome("healthy").unwrap();
    assert_eq!(healthy.files_downloaded, 1);
    assert_eq!(healthy.error_count(), 0);
}
