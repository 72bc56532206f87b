//! Crawl units and their retry policy
//!
//! A [`CrawlUnit`] is the immutable, validated form of one `[[unit]]` entry:
//! the targets to start from and every knob that shapes the crawl.

use crate::config::{validate_unit, UnitConfig};
use crate::crawler::SiteProfile;
use crate::links::PatternSet;
use crate::ConfigError;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP status codes that are retried with backoff
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Exponential backoff policy for idempotent requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retries: u32,

    /// Backoff factor in seconds
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff_factor: 0.0,
        }
    }

    /// Returns true if a response with this status should be retried
    pub fn is_retryable(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }

    /// Sleep before retry number `attempt` (1-based)
    ///
    /// The delay is `backoff_factor * 2^(attempt - 1)` seconds, capped at two
    /// minutes.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if secs.is_nan() || secs >= MAX_BACKOFF.as_secs_f64() {
            return MAX_BACKOFF;
        }
        if secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            backoff_factor: 5.0,
        }
    }
}

/// One independent unit of crawl work
#[derive(Debug, Clone)]
pub struct CrawlUnit {
    /// Label used in logs and reports
    pub name: String,

    /// Per-site image postprocessing
    pub profile: SiteProfile,

    /// Top-level pages, crawled in order
    pub targets: Vec<String>,

    /// Fetch pages through the headless browser
    pub render: bool,

    /// Image ignore patterns
    pub ignore: PatternSet,

    /// Href follow patterns (empty follows everything)
    pub follow: PatternSet,

    /// Maximum recursion depth (inclusive)
    pub max_depth: u32,

    /// Upper bound of the random pause before a page or asset transfer
    pub think_time: Duration,

    /// Retry policy for HEAD/GET requests
    pub retry: RetryPolicy,
}

impl CrawlUnit {
    /// Creates a unit with default settings and no think time
    ///
    /// Mostly useful for programmatic use; workload files go through
    /// [`CrawlUnit::from_config`].
    pub fn new<I, S>(name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            profile: SiteProfile::Generic,
            targets: targets.into_iter().map(Into::into).collect(),
            render: false,
            ignore: PatternSet::empty(),
            follow: PatternSet::empty(),
            max_depth: 1,
            think_time: Duration::ZERO,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds a validated unit from its configuration entry
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlUnit)` - The unit is ready to run
    /// * `Err(ConfigError)` - The entry is malformed; only this unit is affected
    pub fn from_config(config: &UnitConfig) -> Result<Self, ConfigError> {
        validate_unit(config)?;

        Ok(Self {
            name: config.name.clone(),
            profile: config.profile,
            targets: config.targets.clone(),
            render: config.render,
            ignore: PatternSet::new(config.image_ignore_patterns.iter().cloned()),
            follow: PatternSet::new(config.follow_href_patterns.iter().cloned()),
            max_depth: config.max_depth,
            think_time: Duration::from_secs(config.think_time),
            retry: RetryPolicy {
                retries: config.http_retries,
                backoff_factor: config.retry_backoff,
            },
        })
    }

    pub fn with_profile(mut self, profile: SiteProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_ignore(mut self, ignore: PatternSet) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_follow(mut self, follow: PatternSet) -> Self {
        self.follow = follow;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}
