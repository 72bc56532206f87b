//! Storage module for downloaded assets
//!
//! This module provides:
//! - URL-addressed identifiers and file layout (`{id}{ext}`, `{id}-metadata.json`)
//! - The metadata sidecar format
//! - The downloader with its HEAD-based cache check

mod downloader;
mod metadata;

pub use downloader::{
    guess_extension, is_cached, write_atomic, Download, DownloadStatus, Downloader,
};
pub use metadata::{
    asset_identifier, content_path, metadata_path, AssetMetadata, UrlDigests, METADATA_SUFFIX,
};
