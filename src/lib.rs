//! Asset Harvester: a recursive image crawler
//!
//! This crate walks web pages to a bounded depth, collects the image links it
//! finds along the way and downloads them into a URL-addressed local cache.
//! Independent crawl units run in parallel on a bounded worker pool.

pub mod config;
pub mod crawler;
pub mod links;
pub mod output;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Could not read cache entry {}: {reason}", path.display())]
    CacheRead { path: PathBuf, reason: String },

    #[error("Could not determine file extension for content type '{0}'")]
    ExtensionGuess(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Wraps any failure into a per-asset download error
    pub fn download(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlUnit, Dispatcher, Fetcher, RunSummary, SiteProfile};
pub use links::PatternSet;
pub use storage::{AssetMetadata, Downloader};
