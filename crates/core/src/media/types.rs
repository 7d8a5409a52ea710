//! Media item types and resolver configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Resolved media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Parse a caller-supplied type hint. Unknown values give `None`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "image" | "img" | "photo" | "picture" => Some(MediaKind::Image),
            "video" | "vid" | "movie" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub(crate) fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a media reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    /// Any other http(s) URL.
    Direct,
    /// Recognized object-storage host, fetched unmodified.
    CloudStorage,
    /// Shared-drive link that needs file-id extraction.
    SharedDrive,
    /// File already on local disk.
    Local,
}

impl SourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceClass::Direct => "direct",
            SourceClass::CloudStorage => "cloud_storage",
            SourceClass::SharedDrive => "shared_drive",
            SourceClass::Local => "local",
        }
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally addressable media file.
///
/// Owned artifacts were written by the resolver and are removed by
/// [`MediaArtifact::release`], or on drop if never released. Borrowed
/// artifacts (local input files) are never removed.
#[derive(Debug)]
pub struct MediaArtifact {
    path: PathBuf,
    owned: bool,
}

impl MediaArtifact {
    pub fn owned(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: true,
        }
    }

    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Remove the file if this artifact owns it.
    pub async fn release(mut self) {
        if !self.owned {
            return;
        }
        self.owned = false;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove media artifact {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for MediaArtifact {
    fn drop(&mut self) {
        if self.owned {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// How a resolved item is handed to the platform.
#[derive(Debug)]
pub enum MediaLocation {
    /// Local file to upload.
    File(MediaArtifact),
    /// URL the platform fetches itself; nothing to clean up.
    Url(String),
}

/// A resolved media reference.
#[derive(Debug)]
pub struct MediaItem {
    pub raw: String,
    pub kind: MediaKind,
    pub source: SourceClass,
    pub location: MediaLocation,
}

impl MediaItem {
    pub fn artifact_path(&self) -> Option<&Path> {
        match &self.location {
            MediaLocation::File(artifact) => Some(artifact.path()),
            MediaLocation::Url(_) => None,
        }
    }

    /// Release the backing artifact, if any.
    pub async fn release(self) {
        if let MediaLocation::File(artifact) = self.location {
            artifact.release().await;
        }
    }
}

/// Whether direct image URLs are uploaded or linked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageLinkMode {
    /// Download every image and upload it to the account library.
    #[default]
    Upload,
    /// Link direct images after a HEAD check; download when the check fails.
    LinkWithProbe,
}

/// Media resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory for downloaded artifacts.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    #[serde(default)]
    pub image_link_mode: ImageLinkMode,

    /// Shared-drive bodies smaller than this are checked for an HTML interstitial.
    #[serde(default = "default_html_check_bytes")]
    pub html_check_bytes: u64,

    /// User-Agent sent with downloads.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("campaign-uploader")
}

fn default_html_check_bytes() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            image_link_mode: ImageLinkMode::default(),
            html_check_bytes: default_html_check_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl MediaConfig {
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_image_link_mode(mut self, mode: ImageLinkMode) -> Self {
        self.image_link_mode = mode;
        self
    }
}
