//! Site profile definitions for per-site image filtering
//!
//! A profile is a small postprocessing step applied to every image link
//! after the unit's own ignore patterns.

use serde::Deserialize;
use std::fmt;

/// Image filters applied on top of the unit configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteProfile {
    /// No extra filtering
    #[default]
    Generic,

    /// Keep only wanted-person images from fbi.gov
    Fbi,

    /// Drop interpol.int site chrome (logos, notice banners)
    Interpol,
}

/// Image paths that are part of the interpol.int page layout
const INTERPOL_IGNORED: [&str; 2] = [
    "/bundles/interpolfront/",
    "/1/1/1/6/76111-12-eng-GB/RedNoticeEnLR.jpg",
];

impl SiteProfile {
    /// Returns true if the profile accepts this image link
    pub fn keep_image(&self, link: &str) -> bool {
        match self {
            Self::Generic => true,
            Self::Fbi => link.contains("/wanted/"),
            Self::Interpol => !INTERPOL_IGNORED.iter().any(|p| link.contains(p)),
        }
    }

    /// Returns the name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Fbi => "fbi",
            Self::Interpol => "interpol",
        }
    }
}

impl fmt::Display for SiteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
