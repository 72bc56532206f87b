//! Link helpers shared by the extractor and the traversal engine
//!
//! This module provides relative-to-absolute resolution, the always-excluded
//! link schemes, the terminal-extension rule, and memoized pattern sets.

mod patterns;

pub use patterns::PatternSet;

use url::Url;

/// Link schemes that never lead to a crawlable page
const EXCLUDED_SCHEMES: [&str; 2] = ["mailto:", "javascript:"];

/// Path extensions that denote terminal assets rather than pages
const TERMINAL_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".pdf"];

/// Resolves an attribute value against the page URL
///
/// Returns None for empty values or values that cannot be joined to `base`.
///
/// # Examples
///
/// ```
/// use asset_harvester::links::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://x/a").unwrap();
/// assert_eq!(resolve_link("/i.png", &base).unwrap().as_str(), "https://x/i.png");
/// assert!(resolve_link("   ", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Returns true for `mailto:` and `javascript:` links
pub fn is_excluded_scheme(href: &str) -> bool {
    let lowered = href.trim_start().to_ascii_lowercase();
    EXCLUDED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
}

/// Returns true when the link's lowercased path ends in `.jpg`, `.png` or `.pdf`
///
/// Such links are assets, never pages, and are not recursed into.
///
/// # Examples
///
/// ```
/// use asset_harvester::links::is_terminal_asset;
///
/// assert!(is_terminal_asset("https://x/report.PDF"));
/// assert!(is_terminal_asset("https://x/photo.jpg?size=large"));
/// assert!(!is_terminal_asset("https://x/wanted/ecap"));
/// ```
pub fn is_terminal_asset(link: &str) -> bool {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => link.to_ascii_lowercase(),
    };
    TERMINAL_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
