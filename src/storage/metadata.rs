//! Asset metadata sidecars
//!
//! Every downloaded asset `{id}{ext}` gets a JSON sidecar
//! `{id}-metadata.json` describing the response it came from. The sidecar is
//! what a later run consults to decide whether the asset is already cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Suffix appended to the identifier to name the sidecar
pub const METADATA_SUFFIX: &str = "-metadata.json";

/// Persisted record of one downloaded asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// URL the asset was requested from
    pub source_url: String,

    /// Final URL after redirects
    pub url: String,

    /// Response headers of the GET that produced the file
    pub headers: BTreeMap<String, String>,

    pub status_code: u16,

    /// Canonical reason phrase of the status code
    pub reason: String,

    /// Time from sending the GET to having the full body
    pub elapsed_microseconds: u64,

    /// The request was redirected to another URL
    pub is_redirect: bool,

    /// The final response is itself a permanent redirect (301/308)
    pub is_permanent_redirect: bool,

    // Digests of the source URL; sha1 is the asset identifier
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha384: String,
    pub sha512: String,

    /// Local path of the content file
    pub path: PathBuf,

    pub downloaded_at: DateTime<Utc>,
}

impl AssetMetadata {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(self.headers.iter(), name)
    }
}

/// Digests of an asset URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlDigests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha384: String,
    pub sha512: String,
}

impl UrlDigests {
    /// Hashes the UTF-8 bytes of `url` with every supported digest
    pub fn of(url: &str) -> Self {
        let bytes = url.as_bytes();
        Self {
            md5: format!("{:x}", md5::compute(bytes)),
            sha1: hex::encode(Sha1::digest(bytes)),
            sha256: hex::encode(Sha256::digest(bytes)),
            sha384: hex::encode(Sha384::digest(bytes)),
            sha512: hex::encode(Sha512::digest(bytes)),
        }
    }
}

/// Returns the cache identifier of an asset URL (SHA-1 hex)
///
/// # Examples
///
/// ```
/// use asset_harvester::storage::asset_identifier;
///
/// let id = asset_identifier("https://x/i.png");
/// assert_eq!(id.len(), 40);
/// assert_eq!(id, asset_identifier("https://x/i.png"));
/// ```
pub fn asset_identifier(url: &str) -> String {
    hex::encode(Sha1::digest(url.as_bytes()))
}

/// Path of the sidecar for an identifier
pub fn metadata_path(output: &Path, identifier: &str) -> PathBuf {
    output.join(format!("{}{}", identifier, METADATA_SUFFIX))
}

/// Path of the content file for an identifier and extension (with dot)
pub fn content_path(output: &Path, identifier: &str, extension: &str) -> PathBuf {
    output.join(format!("{}{}", identifier, extension))
}

/// Case-insensitive lookup over header pairs
pub fn find_header<'a, I>(headers: I, name: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    headers
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Case-insensitive lookup in a header snapshot
pub fn snapshot_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    find_header(headers.iter(), name)
}
