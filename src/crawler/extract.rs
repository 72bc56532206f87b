//! Link extraction from parsed HTML
//!
//! This module turns a parsed document into two lazy streams of absolute
//! URLs:
//! - image sources (`<img src>`), minus anything matching the ignore patterns
//! - anchor targets (`<a href>`), restricted to the follow patterns
//!
//! Both streams borrow the document and can be restarted by calling the
//! function again.

use crate::links::{is_excluded_scheme, resolve_link, PatternSet};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static IMAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img[src]").expect("BUG: hardcoded CSS selector 'img[src]' is invalid")
});

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid")
});

/// Parses raw page bytes into a queryable document
///
/// Invalid UTF-8 sequences are replaced rather than rejected; the HTML parser
/// itself never fails.
pub fn parse_document(content: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(content))
}

/// Extracts absolute image URLs from the document
///
/// Every `<img src>` is resolved against `base`. A URL is dropped when any
/// pattern in `ignore` is a substring of it.
///
/// # Arguments
///
/// * `doc` - The parsed page
/// * `base` - URL the page was fetched from
/// * `ignore` - Image ignore patterns
///
/// # Example
///
/// ```
/// use asset_harvester::crawler::{extract_images, parse_document};
/// use asset_harvester::links::PatternSet;
/// use url::Url;
///
/// let doc = parse_document(br#"<img src="/i.png"><img src="/logo.png">"#);
/// let base = Url::parse("https://x/a").unwrap();
/// let ignore = PatternSet::new(["logo.png"]);
/// let images: Vec<String> = extract_images(&doc, &base, &ignore).collect();
/// assert_eq!(images, vec!["https://x/i.png".to_string()]);
/// ```
pub fn extract_images<'a>(
    doc: &'a Html,
    base: &'a Url,
    ignore: &'a PatternSet,
) -> impl Iterator<Item = String> + 'a {
    doc.select(&IMAGE_SELECTOR)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(move |src| resolve_link(src, base))
        .map(String::from)
        .filter(move |link| {
            let ignored = ignore.matches_any(link);
            if ignored {
                tracing::debug!("Ignoring image: {}", link);
            }
            !ignored
        })
}

/// Extracts absolute anchor URLs from the document
///
/// # Link Rules
///
/// **Always excluded:**
/// - `mailto:` and `javascript:` links
/// - fragment-only links (same page anchors)
/// - targets that do not resolve to an http(s) URL
///
/// **Follow patterns:**
/// - empty set: every remaining link is kept
/// - otherwise: a link is kept only if it contains at least one pattern
///
/// # Arguments
///
/// * `doc` - The parsed page
/// * `base` - URL the page was fetched from
/// * `follow` - Href follow patterns
pub fn extract_anchors<'a>(
    doc: &'a Html,
    base: &'a Url,
    follow: &'a PatternSet,
) -> impl Iterator<Item = String> + 'a {
    doc.select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| !is_excluded_scheme(href) && !href.trim_start().starts_with('#'))
        .filter_map(move |href| resolve_link(href, base))
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .map(String::from)
        .filter(move |link| follow.is_empty() || follow.matches_any(link))
}
