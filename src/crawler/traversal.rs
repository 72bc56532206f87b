//! Recursive page traversal
//!
//! Depth-first descent over navigation links, collecting image links into a
//! caller-owned set. The visited set and depth counter are scoped to one
//! top-level target; the asset set spans every target of a unit.

use crate::crawler::extract::{extract_anchors, extract_images, parse_document};
use crate::crawler::{CrawlUnit, Fetcher};
use crate::links::is_terminal_asset;
use futures::future::BoxFuture;
use std::collections::{BTreeSet, HashSet};
use url::Url;

/// Pages already fetched during one traversal
pub type VisitedSet = HashSet<String>;

/// Image links discovered by a unit, iterated in sorted order
pub type AssetLinkSet = BTreeSet<String>;

/// Links harvested from one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLinks {
    /// Image links accepted by the unit's patterns and profile
    pub images: Vec<String>,

    /// Anchor links accepted by the follow patterns
    pub anchors: Vec<String>,
}

/// Parses page content and collects its image and anchor links
///
/// The parsed document is dropped before returning so that no parser state
/// is held across an await point.
pub fn harvest_links(content: &[u8], base: &Url, unit: &CrawlUnit) -> PageLinks {
    let doc = parse_document(content);

    let images = extract_images(&doc, base, &unit.ignore)
        .filter(|link| {
            let keep = unit.profile.keep_image(link);
            if !keep {
                tracing::debug!("ignore hit: {}", link);
            }
            keep
        })
        .collect();
    let anchors = extract_anchors(&doc, base, &unit.follow).collect();

    PageLinks { images, anchors }
}

/// Crawls one page and recurses into its links
///
/// # Behavior
///
/// - Returns immediately if `url` was already visited or `depth` exceeds the
///   unit's max depth; nothing is fetched.
/// - Otherwise the page is fetched and `url` is marked visited before any
///   child is crawled.
/// - A fetch failure or an empty page ends this branch only.
/// - Images go into `assets`; anchors that are not terminal assets are
///   crawled at `depth + 1`.
///
/// # Arguments
///
/// * `fetcher` - Network access for the unit
/// * `unit` - The crawl unit being processed
/// * `url` - Absolute URL of the page
/// * `visited` - Pages already seen in this traversal
/// * `assets` - Accumulated image links
/// * `depth` - Current depth, 0 for a top-level target
pub fn crawl_page<'f>(
    fetcher: &'f Fetcher,
    unit: &'f CrawlUnit,
    url: &'f str,
    visited: &'f mut VisitedSet,
    assets: &'f mut AssetLinkSet,
    depth: u32,
) -> BoxFuture<'f, ()> {
    Box::pin(async move {
        if visited.contains(url) || depth > unit.max_depth {
            return;
        }

        let fetched = fetcher.fetch(url, unit.render).await;
        visited.insert(url.to_string());

        let (content, served_from) = match fetched {
            Ok(result) => match result.content {
                Some(content) if !content.is_empty() => {
                    (content, result.final_url.unwrap_or_else(|| url.to_string()))
                }
                _ => return,
            },
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return;
            }
        };

        let base = match Url::parse(&served_from) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot resolve links against {}: {}", served_from, e);
                return;
            }
        };
        if served_from != url {
            visited.insert(served_from);
        }

        let links = harvest_links(&content, &base, unit);
        drop(content);

        for image in links.images {
            if assets.insert(image.clone()) {
                tracing::debug!("Found image: {}", image);
            }
        }

        for anchor in links.anchors {
            if is_terminal_asset(&anchor) {
                tracing::debug!("Not following terminal asset: {}", anchor);
                continue;
            }
            crawl_page(fetcher, unit, &anchor, visited, assets, depth + 1).await;
        }
    })
}

/// Crawls every target of a unit and returns the discovered image links
///
/// Each target starts with a fresh visited set at depth 0. Images found
/// under different targets are merged into one set.
pub async fn crawl_targets(fetcher: &Fetcher, unit: &CrawlUnit) -> AssetLinkSet {
    let mut assets = AssetLinkSet::new();

    for target in &unit.targets {
        tracing::info!("[{}] crawling target: {}", unit.name, target);
        let start = normalize_target(target);
        let mut visited = VisitedSet::new();
        crawl_page(fetcher, unit, &start, &mut visited, &mut assets, 0).await;
        tracing::info!(
            "[{}] visited {} pages from {}, {} images so far",
            unit.name,
            visited.len(),
            target,
            assets.len()
        );
    }

    assets
}

/// Serializes a target the way resolved links are serialized
///
/// `https://host` becomes `https://host/`, so a page linking back to the
/// root is recognized as already visited.
pub fn normalize_target(target: &str) -> String {
    Url::parse(target)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| target.to_string())
}
