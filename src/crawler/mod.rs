//! Crawler module for page fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and the headless-render fallback
//! - HTML parsing and image/anchor link extraction
//! - Depth-bounded recursive traversal
//! - The worker pool that runs crawl units in parallel

mod dispatcher;
mod extract;
mod fetcher;
mod profile;
mod render;
mod traversal;
mod unit;

pub use dispatcher::{run_unit, CrawlOutcome, Dispatcher, RunSummary};
pub use extract::{extract_anchors, extract_images, parse_document};
pub use fetcher::{build_http_client, header_map, think, FetchResult, Fetcher};
pub use profile::SiteProfile;
pub use render::Renderer;
pub use traversal::{
    crawl_page, crawl_targets, harvest_links, normalize_target, AssetLinkSet, PageLinks,
    VisitedSet,
};
pub use unit::{CrawlUnit, RetryPolicy};
