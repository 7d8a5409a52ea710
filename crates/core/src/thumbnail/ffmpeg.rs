//! First-frame extraction through an ffmpeg subprocess.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::ThumbnailError;

/// Grabs the first frame of a video with the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegFrameGrabber {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl FfmpegFrameGrabber {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }

    /// Builds ffmpeg arguments for a single high-quality JPEG frame.
    fn build_args(video: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-ss".to_string(),
            "00:00:00".to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Write the first frame of `video` to `output` as JPEG.
    pub async fn grab(&self, video: &Path, output: &Path) -> Result<(), ThumbnailError> {
        let args = Self::build_args(video, output);
        debug!("Running {} {}", self.ffmpeg_path.display(), args.join(" "));

        let child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output_result = match timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ThumbnailError::Unavailable(format!(
                        "ffmpeg not found at {}",
                        self.ffmpeg_path.display()
                    ))
                } else {
                    ThumbnailError::Io(e)
                }
            })?,
            Err(_) => {
                return Err(ThumbnailError::Failed(format!(
                    "ffmpeg timed out after {:?}",
                    self.timeout
                )))
            }
        };

        if !output_result.status.success() {
            return Err(ThumbnailError::Failed(format!(
                "ffmpeg exited with code {:?}: {}",
                output_result.status.code(),
                String::from_utf8_lossy(&output_result.stderr).trim()
            )));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(ThumbnailError::Failed(
                "ffmpeg produced no output frame".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args =
            FfmpegFrameGrabber::build_args(Path::new("/in/clip.mp4"), Path::new("/out/t.jpg"));
        assert_eq!(args[0], "-y");
        assert_eq!(args[2], "/in/clip.mp4");
        let vframes = args.iter().position(|a| a == "-vframes").unwrap();
        assert_eq!(args[vframes + 1], "1");
        let quality = args.iter().position(|a| a == "-q:v").unwrap();
        assert_eq!(args[quality + 1], "2");
        assert_eq!(args.last().unwrap(), "/out/t.jpg");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let grabber = FfmpegFrameGrabber::new(
            "/nonexistent/bin/ffmpeg-for-tests",
            Duration::from_secs(5),
        );
        let err = grabber
            .grab(Path::new("/tmp/in.mp4"), Path::new("/tmp/out.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Unavailable(_)));
    }
}
