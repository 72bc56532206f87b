use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Number of memoized match results kept per pattern set
const CACHE_CAPACITY: usize = 1000;

/// A set of substring patterns with a memoized match predicate
///
/// Each set owns its own bounded cache, so two units configured with
/// different patterns never see each other's results.
///
/// # Examples
///
/// ```
/// use asset_harvester::links::PatternSet;
///
/// let ignore = PatternSet::new(["logo.png", "data:image/svg+xml"]);
/// assert!(ignore.matches_any("https://x/static/logo.png"));
/// assert!(!ignore.matches_any("https://x/photos/1.jpg"));
/// ```
pub struct PatternSet {
    patterns: Vec<String>,
    cache: Mutex<LruCache<String, bool>>,
}

impl PatternSet {
    /// Creates a pattern set from any list of strings
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::MIN.saturating_add(CACHE_CAPACITY - 1),
            )),
        }
    }

    /// Creates a set with no patterns
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Returns true if the set has no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The configured patterns, in declaration order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true if any pattern is a substring of `candidate`
    ///
    /// An empty set never matches. Results are memoized per candidate.
    pub fn matches_any(&self, candidate: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&hit) = cache.get(candidate) {
            return hit;
        }

        let matched = self.patterns.iter().any(|p| candidate.contains(p.as_str()));
        cache.put(candidate.to_string(), matched);
        matched
    }

    /// Number of memoized results currently held
    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Clone for PatternSet {
    // The clone starts with a cold cache
    fn clone(&self) -> Self {
        Self::new(self.patterns.clone())
    }
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}
