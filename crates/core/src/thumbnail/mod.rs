//! Video thumbnail extraction.
//!
//! A poster image is produced by the first tier that works:
//! an optional in-process [`FrameDecoder`], the ffmpeg CLI, or a
//! deterministic placeholder rendered with the `image` crate.

mod config;
mod extractor;
mod ffmpeg;
mod font;
mod placeholder;

pub use config::ThumbnailConfig;
pub use extractor::{FrameDecoder, ThumbnailExtractor};
pub use ffmpeg::FfmpegFrameGrabber;
pub use placeholder::{placeholder_color, title_line};

use thiserror::Error;

/// Errors from a single extraction tier.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The tier cannot run here (tool missing, no decoder).
    #[error("Tier unavailable: {0}")]
    Unavailable(String),

    #[error("Frame extraction failed: {0}")]
    Failed(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
