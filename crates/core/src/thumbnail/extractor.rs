//! Layered thumbnail extraction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::ThumbnailConfig;
use super::ffmpeg::FfmpegFrameGrabber;
use super::placeholder;
use super::ThumbnailError;
use crate::media::MediaArtifact;
use crate::metrics;

/// In-process first-frame decoding.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Write the first frame of `video` to `output` as JPEG.
    async fn decode_first_frame(&self, video: &Path, output: &Path) -> Result<(), ThumbnailError>;
}

/// Derives a poster image for a video.
///
/// Tiers run in order until one succeeds: the optional in-process decoder,
/// ffmpeg, then a generated placeholder. The decoder tier is skipped
/// unless one is supplied through [`ThumbnailExtractor::with_decoder`].
pub struct ThumbnailExtractor {
    decoder: Option<Arc<dyn FrameDecoder>>,
    ffmpeg: Option<FfmpegFrameGrabber>,
    config: ThumbnailConfig,
}

impl ThumbnailExtractor {
    pub fn new(config: ThumbnailConfig) -> Self {
        let ffmpeg = config.use_ffmpeg.then(|| {
            FfmpegFrameGrabber::new(
                config.ffmpeg_path.clone(),
                Duration::from_secs(config.timeout_secs),
            )
        });
        Self {
            decoder: None,
            ffmpeg,
            config,
        }
    }

    /// Add an in-process decoder as the first tier.
    pub fn with_decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Extract a thumbnail. Returns `None` only if every tier failed.
    pub async fn extract(&self, video: &Path) -> Option<MediaArtifact> {
        if let Err(e) = tokio::fs::create_dir_all(&self.config.temp_dir).await {
            warn!(
                "Cannot create thumbnail directory {}: {}",
                self.config.temp_dir.display(),
                e
            );
            metrics::THUMBNAIL_TIERS.with_label_values(&["none"]).inc();
            return None;
        }
        let output = self.config.temp_dir.join(format!("{}.jpg", Uuid::new_v4()));

        if let Some(decoder) = &self.decoder {
            match decoder.decode_first_frame(video, &output).await {
                Ok(()) => return Some(self.produced("decoder", output)),
                Err(e) => {
                    debug!("Frame decoder failed for {}: {}", video.display(), e);
                    discard(&output).await;
                }
            }
        }

        if let Some(ffmpeg) = &self.ffmpeg {
            match ffmpeg.grab(video, &output).await {
                Ok(()) => return Some(self.produced("ffmpeg", output)),
                Err(e) => {
                    debug!("ffmpeg frame grab failed for {}: {}", video.display(), e);
                    discard(&output).await;
                }
            }
        }

        match self.write_placeholder(video, &output).await {
            Ok(()) => Some(self.produced("placeholder", output)),
            Err(e) => {
                warn!("Placeholder thumbnail failed for {}: {}", video.display(), e);
                discard(&output).await;
                metrics::THUMBNAIL_TIERS.with_label_values(&["none"]).inc();
                None
            }
        }
    }

    fn produced(&self, tier: &str, output: PathBuf) -> MediaArtifact {
        debug!(tier, path = %output.display(), "Thumbnail produced");
        metrics::THUMBNAIL_TIERS.with_label_values(&[tier]).inc();
        MediaArtifact::owned(output)
    }

    async fn write_placeholder(&self, video: &Path, output: &Path) -> Result<(), ThumbnailError> {
        let video = video.to_path_buf();
        let (width, height, quality) = (
            self.config.width,
            self.config.height,
            self.config.jpeg_quality,
        );

        let bytes = tokio::task::spawn_blocking(move || {
            let image = placeholder::render(&video, width, height);
            placeholder::encode_jpeg(&image, quality)
        })
        .await
        .map_err(|e| ThumbnailError::Failed(format!("placeholder task failed: {}", e)))??;

        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

async fn discard(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}
