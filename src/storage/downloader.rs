//! URL-addressed asset downloader
//!
//! Assets are stored as `{sha1(url)}{ext}` with a JSON sidecar. Before any
//! body is transferred, a HEAD request is compared against the sidecar of a
//! previous run; when they agree and the file on disk is complete, the GET
//! is skipped entirely.

use crate::crawler::{header_map, Fetcher};
use crate::storage::metadata::{
    asset_identifier, content_path, metadata_path, snapshot_header, AssetMetadata, UrlDigests,
};
use crate::HarvestError;
use chrono::Utc;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// How a download request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// The body was transferred and written
    Downloaded,

    /// A complete copy from an earlier run was reused
    Cached,
}

/// Result of a successful download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Local path of the content file
    pub path: PathBuf,

    pub status: DownloadStatus,
}

/// Downloads assets into an output directory through a unit's fetcher
pub struct Downloader<'f> {
    fetcher: &'f Fetcher,
    output: PathBuf,
}

impl<'f> Downloader<'f> {
    /// Creates a downloader writing into `output`
    pub fn new(fetcher: &'f Fetcher, output: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output: output.into(),
        }
    }

    /// Downloads one asset unless an identical copy is already cached
    ///
    /// # Download Flow
    ///
    /// 1. Pause for a random think time
    /// 2. HEAD the asset for Content-Type and Content-Length
    /// 3. Guess the file extension from Content-Type (unknown: no extension)
    /// 4. Cache hit if the sidecar matches the HEAD response and the file on
    ///    disk has exactly Content-Length bytes: return without a GET
    /// 5. Otherwise GET, write the content file, then the sidecar
    ///
    /// # Returns
    ///
    /// * `Ok(Download)` - Path of the file and whether it was transferred
    /// * `Err(HarvestError::Download)` - The asset could not be fetched or stored
    pub async fn download(&self, url: &str) -> Result<Download, HarvestError> {
        let identifier = asset_identifier(url);

        self.fetcher.think().await;

        let head = self
            .fetcher
            .head(url)
            .await
            .map_err(|e| HarvestError::download(url, e))?;
        let head_headers = header_map(head.headers());
        drop(head);

        let content_type = snapshot_header(&head_headers, CONTENT_TYPE.as_str()).unwrap_or("");
        let extension = match guess_extension(content_type) {
            Ok(ext) => ext,
            Err(e) => {
                tracing::warn!("{}", e);
                String::new()
            }
        };

        let metadata_file = metadata_path(&self.output, &identifier);
        let destination = content_path(&self.output, &identifier, &extension);

        match is_cached(&head_headers, &metadata_file, &destination).await {
            Ok(true) => {
                tracing::info!("Asset already cached locally: {}", destination.display());
                return Ok(Download {
                    path: destination,
                    status: DownloadStatus::Cached,
                });
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("{}; downloading again", e),
        }

        self.transfer(url, &destination, &metadata_file)
            .await
            .map_err(|e| match e {
                HarvestError::Download { .. } => e,
                other => HarvestError::download(url, other),
            })?;

        Ok(Download {
            path: destination,
            status: DownloadStatus::Downloaded,
        })
    }

    /// GETs the asset and persists content then metadata
    async fn transfer(
        &self,
        url: &str,
        destination: &Path,
        metadata_file: &Path,
    ) -> Result<(), HarvestError> {
        let started = Instant::now();
        let response = self.fetcher.get(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::download(
                url,
                format!("unexpected status {}", status.as_u16()),
            ));
        }

        let final_url = response.url().to_string();
        let headers = header_map(response.headers());
        let body = response.bytes().await.map_err(|e| HarvestError::Http {
            url: url.to_string(),
            source: e,
        })?;
        let elapsed = started.elapsed();

        let digests = UrlDigests::of(url);

        let metadata = AssetMetadata {
            source_url: url.to_string(),
            is_redirect: final_url != url,
            url: final_url,
            headers: headers.into_iter().collect(),
            status_code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            elapsed_microseconds: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            is_permanent_redirect: matches!(
                status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::PERMANENT_REDIRECT
            ),
            md5: digests.md5,
            sha1: digests.sha1,
            sha256: digests.sha256,
            sha384: digests.sha384,
            sha512: digests.sha512,
            path: destination.to_path_buf(),
            downloaded_at: Utc::now(),
        };

        tokio::fs::create_dir_all(&self.output).await?;

        tracing::info!("write file: {}", destination.display());
        write_atomic(destination, body).await?;
        write_atomic(metadata_file, serde_json::to_vec(&metadata)?).await?;

        Ok(())
    }
}

/// Guesses a file extension (with leading dot) from a Content-Type value
///
/// Parameters such as `; charset=...` are ignored. Common image types map to
/// their conventional extension; anything else is looked up in the MIME
/// database.
///
/// # Examples
///
/// ```
/// use asset_harvester::storage::guess_extension;
///
/// assert_eq!(guess_extension("image/jpeg").unwrap(), ".jpg");
/// assert_eq!(guess_extension("image/png; q=1").unwrap(), ".png");
/// assert!(guess_extension("image/foober").is_err());
/// ```
pub fn guess_extension(content_type: &str) -> Result<String, HarvestError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let preferred = match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        "image/avif" => Some("avif"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "application/pdf" => Some("pdf"),
        "text/html" => Some("html"),
        _ => None,
    };

    preferred
        .or_else(|| {
            mime_guess::get_mime_extensions_str(&essence).and_then(|exts| exts.first().copied())
        })
        .map(|ext| format!(".{}", ext))
        .ok_or_else(|| HarvestError::ExtensionGuess(content_type.to_string()))
}

/// Checks whether a complete copy of the asset is already on disk
///
/// # Returns
///
/// * `Ok(true)` - Sidecar Content-Type and Content-Length equal the HEAD
///   response and the content file has exactly Content-Length bytes
/// * `Ok(false)` - No sidecar, or any of the above differs
/// * `Err(HarvestError::CacheRead)` - The sidecar exists but cannot be read
pub async fn is_cached(
    head: &HashMap<String, String>,
    metadata_file: &Path,
    destination: &Path,
) -> Result<bool, HarvestError> {
    let raw = match tokio::fs::read(metadata_file).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("metadata_file not found: {}", metadata_file.display());
            return Ok(false);
        }
        Err(e) => return Err(cache_read_error(metadata_file, e)),
    };

    let metadata: AssetMetadata =
        serde_json::from_slice(&raw).map_err(|e| cache_read_error(metadata_file, e))?;

    let head_type = snapshot_header(head, CONTENT_TYPE.as_str());
    let head_length = snapshot_header(head, CONTENT_LENGTH.as_str());

    let Some(expected_len) = head_length.and_then(|v| v.trim().parse::<u64>().ok()) else {
        tracing::debug!("No usable Content-Length for {}", destination.display());
        return Ok(false);
    };

    if head_type != metadata.header(CONTENT_TYPE.as_str())
        || head_length != metadata.header(CONTENT_LENGTH.as_str())
    {
        tracing::debug!(
            "metadata did not match for {}: head={:?}/{:?}",
            destination.display(),
            head_type,
            head_length
        );
        return Ok(false);
    }

    match tokio::fs::metadata(destination).await {
        Ok(stat) => Ok(stat.is_file() && stat.len() == expected_len),
        Err(_) => Ok(false),
    }
}

fn cache_read_error(path: &Path, reason: impl std::fmt::Display) -> HarvestError {
    HarvestError::CacheRead {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Writes `bytes` to a temp file next to `path` and persists it over `path`
///
/// Readers see either the previous file or the complete new one. The temp
/// file is removed if the write fails.
pub async fn write_atomic<B>(path: &Path, bytes: B) -> Result<(), HarvestError>
where
    B: AsRef<[u8]> + Send + 'static,
{
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut temp_file = NamedTempFile::new_in(&parent)?;
        temp_file.write_all(bytes.as_ref())?;
        temp_file.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)??;

    Ok(())
}
