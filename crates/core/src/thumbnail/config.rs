//! Configuration for thumbnail extraction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the thumbnail extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Whether to try ffmpeg before falling back to a placeholder.
    #[serde(default = "default_true")]
    pub use_ffmpeg: bool,

    /// Timeout for a single ffmpeg frame grab in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Directory for generated thumbnails.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Placeholder width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Placeholder height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// JPEG quality (1-100).
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("campaign-uploader").join("thumbnails")
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_quality() -> u8 {
    95
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            use_ffmpeg: default_true(),
            timeout_secs: default_timeout(),
            temp_dir: default_temp_dir(),
            width: default_width(),
            height: default_height(),
            jpeg_quality: default_quality(),
        }
    }
}

impl ThumbnailConfig {
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn without_ffmpeg(mut self) -> Self {
        self.use_ffmpeg = false;
        self
    }
}
