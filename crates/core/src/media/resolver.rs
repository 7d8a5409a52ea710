//! Turns raw media references into uploadable media items.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classify::{classify, MediaReference, ReferenceTarget};
use super::error::{FetchError, MediaFetchError};
use super::fetcher::HttpFetcher;
use super::types::{
    ImageLinkMode, MediaArtifact, MediaConfig, MediaItem, MediaKind, MediaLocation, SourceClass,
};
use crate::metrics;
use crate::retry::{OperationClass, RetryExecutor};

static CONFIRM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"confirm=([0-9A-Za-z_-]+)").unwrap());

/// Resolves media references through the retry executor.
///
/// Every artifact it writes lives in `temp_dir` under a unique name and is
/// owned by the returned [`MediaItem`]. Failed downloads leave nothing behind.
pub struct MediaResolver {
    fetcher: Arc<dyn HttpFetcher>,
    retry: RetryExecutor,
    config: MediaConfig,
}

impl MediaResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, retry: RetryExecutor, config: MediaConfig) -> Self {
        Self {
            fetcher,
            retry,
            config,
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Resolve a raw reference into a media item.
    pub async fn resolve(
        &self,
        raw: &str,
        hint: Option<MediaKind>,
    ) -> Result<MediaItem, MediaFetchError> {
        let reference = classify(raw, hint)?;
        debug!(
            reference = %reference.raw,
            kind = %reference.kind,
            source = %reference.source,
            "Classified media reference"
        );

        let result = match &reference.target {
            ReferenceTarget::Path(path) => self.resolve_local(&reference, path).await,
            ReferenceTarget::Url(url) => self.resolve_remote(&reference, url).await,
        };

        let outcome = match &result {
            Ok(MediaItem {
                location: MediaLocation::Url(_),
                ..
            }) => "linked",
            Ok(_) => "ok",
            Err(_) => "error",
        };
        metrics::MEDIA_FETCHES
            .with_label_values(&[reference.kind.as_str(), reference.source.as_str(), outcome])
            .inc();

        result
    }

    async fn resolve_local(
        &self,
        reference: &MediaReference,
        path: &Path,
    ) -> Result<MediaItem, MediaFetchError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(MediaItem {
                raw: reference.raw.clone(),
                kind: reference.kind,
                source: SourceClass::Local,
                location: MediaLocation::File(MediaArtifact::borrowed(path)),
            }),
            _ => Err(MediaFetchError::LocalFileMissing(path.to_path_buf())),
        }
    }

    async fn resolve_remote(
        &self,
        reference: &MediaReference,
        url: &str,
    ) -> Result<MediaItem, MediaFetchError> {
        if self.should_probe(reference) {
            let fetcher = &self.fetcher;
            match self
                .retry
                .execute(OperationClass::ProbeMedia, |_| fetcher.probe(url))
                .await
            {
                Ok(()) => {
                    debug!(url, "Probe succeeded, linking image by URL");
                    return Ok(MediaItem {
                        raw: reference.raw.clone(),
                        kind: reference.kind,
                        source: reference.source,
                        location: MediaLocation::Url(url.to_string()),
                    });
                }
                Err(e) => {
                    warn!(url, error = %e, "Probe failed, downloading instead");
                }
            }
        }

        tokio::fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(|e| MediaFetchError::io(&reference.raw, e))?;

        let extension = reference
            .extension
            .as_deref()
            .unwrap_or(reference.kind.default_extension());
        let dest = self
            .config
            .temp_dir
            .join(format!("{}.{}", Uuid::new_v4(), extension));

        let class = match reference.kind {
            MediaKind::Image => OperationClass::FetchImage,
            MediaKind::Video => OperationClass::FetchVideo,
        };
        let shared_drive = reference.source == SourceClass::SharedDrive;
        let dest_path = dest.as_path();

        let result = self
            .retry
            .execute(class, move |_| self.download_once(url, dest_path, shared_drive))
            .await;

        match result {
            Ok(size) => {
                info!(
                    reference = %reference.raw,
                    kind = %reference.kind,
                    size,
                    "Media downloaded"
                );
                Ok(MediaItem {
                    raw: reference.raw.clone(),
                    kind: reference.kind,
                    source: reference.source,
                    location: MediaLocation::File(MediaArtifact::owned(dest)),
                })
            }
            Err(e) => {
                if let Err(io) = tokio::fs::remove_file(&dest).await {
                    if io.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial download {}: {}", dest.display(), io);
                    }
                }
                Err(MediaFetchError::from_retry(&reference.raw, e))
            }
        }
    }

    fn should_probe(&self, reference: &MediaReference) -> bool {
        self.config.image_link_mode == ImageLinkMode::LinkWithProbe
            && reference.kind == MediaKind::Image
            && matches!(
                reference.source,
                SourceClass::Direct | SourceClass::CloudStorage
            )
    }

    /// One download attempt, including the shared-drive confirmation hop.
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        shared_drive: bool,
    ) -> Result<u64, FetchError> {
        let fetched = self.fetcher.fetch_to_file(url, dest).await?;
        if fetched.size == 0 {
            return Err(FetchError::Transient("empty response body".to_string()));
        }

        let html_typed = fetched
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"));
        if !shared_drive || (!html_typed && fetched.size >= self.config.html_check_bytes) {
            return Ok(fetched.size);
        }

        let body = read_body(dest).await?;
        if !looks_like_html(&body) {
            return Ok(fetched.size);
        }

        let Some(token) = confirm_token(&body) else {
            return Err(FetchError::Permanent(
                "HTML returned instead of media".to_string(),
            ));
        };

        debug!("Shared-drive interstitial, confirming download");
        let confirmed = format!("{}&confirm={}", url, token);
        let fetched = self.fetcher.fetch_to_file(&confirmed, dest).await?;
        if fetched.size == 0 {
            return Err(FetchError::Transient("empty response body".to_string()));
        }
        if fetched.size < self.config.html_check_bytes && looks_like_html(&read_body(dest).await?) {
            return Err(FetchError::Permanent(
                "HTML returned instead of media".to_string(),
            ));
        }

        Ok(fetched.size)
    }
}

async fn read_body(path: &Path) -> Result<String, FetchError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| FetchError::Permanent(format!("Cannot read {}: {}", path.display(), e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(1024).collect::<String>().to_ascii_lowercase();
    let trimmed = head.trim_start();
    trimmed.starts_with("<!doctype html") || trimmed.starts_with("<html") || head.contains("<html")
}

fn confirm_token(body: &str) -> Option<String> {
    CONFIRM_TOKEN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{RetryPolicy, RetryPolicyTable};
    use crate::testing::MockFetcher;
    use std::time::Duration;
    use tempfile::TempDir;

    fn resolver(fetcher: Arc<MockFetcher>, dir: &TempDir, mode: ImageLinkMode) -> MediaResolver {
        let policy = RetryPolicy::new(3, Duration::from_secs(5), Duration::from_secs(1))
            .with_pause(Duration::ZERO);
        MediaResolver::new(
            fetcher,
            RetryExecutor::new(RetryPolicyTable::uniform(policy)),
            MediaConfig::default()
                .with_temp_dir(dir.path().join("media"))
                .with_image_link_mode(mode),
        )
    }

    #[test]
    fn test_confirm_token_extraction() {
        let body = r#"<html><a href="/uc?export=download&amp;confirm=t0K-en_1&amp;id=abc">"#;
        assert_eq!(confirm_token(body).as_deref(), Some("t0K-en_1"));
        assert!(confirm_token("<html>no token</html>").is_none());
    }

    #[test]
    fn test_html_detection() {
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
        assert!(looks_like_html("<HTML><body>"));
        assert!(!looks_like_html("\u{89}PNG\r\n"));
    }

    #[tokio::test]
    async fn test_downloads_direct_image() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher
            .set_body("https://example.com/a.png", b"png-bytes".to_vec())
            .await;

        let item = resolver(fetcher.clone(), &dir, ImageLinkMode::Upload)
            .resolve("https://example.com/a.png", None)
            .await
            .unwrap();

        assert_eq!(item.kind, MediaKind::Image);
        let path = item.artifact_path().unwrap().to_path_buf();
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");

        item.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_body_is_retried() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let url = "https://example.com/v.mp4";
        fetcher.push_body(url, Vec::new()).await;
        fetcher.push_body(url, b"video".to_vec()).await;

        let item = resolver(fetcher.clone(), &dir, ImageLinkMode::Upload)
            .resolve(url, None)
            .await
            .unwrap();

        assert_eq!(item.kind, MediaKind::Video);
        assert_eq!(fetcher.fetch_count(url).await, 2);
        item.release().await;
    }

    #[tokio::test]
    async fn test_exhausted_fetch_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let url = "https://example.com/broken.jpg";
        fetcher
            .set_error(url, FetchError::Transient("HTTP 503".to_string()))
            .await;

        let err = resolver(fetcher.clone(), &dir, ImageLinkMode::Upload)
            .resolve(url, None)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaFetchError::Fetch { attempts: 3, .. }));
        assert_eq!(fetcher.fetch_count(url).await, 3);
        let leftovers = std::fs::read_dir(dir.path().join("media")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_shared_drive_confirmation_hop() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let download = "https://drive.google.com/uc?export=download&id=FILE1";
        fetcher
            .set_body(
                download,
                b"<html><a href=\"?confirm=AbC1&id=FILE1\">Download anyway</a></html>".to_vec(),
            )
            .await;
        fetcher
            .set_body(&format!("{}&confirm=AbC1", download), b"real-video".to_vec())
            .await;

        let item = resolver(fetcher.clone(), &dir, ImageLinkMode::Upload)
            .resolve("https://drive.google.com/file/d/FILE1/view", Some(MediaKind::Video))
            .await
            .unwrap();

        assert_eq!(item.source, SourceClass::SharedDrive);
        assert_eq!(std::fs::read(item.artifact_path().unwrap()).unwrap(), b"real-video");
        item.release().await;
    }

    #[tokio::test]
    async fn test_shared_drive_html_without_token_is_permanent() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let download = "https://drive.google.com/uc?export=download&id=FILE2";
        fetcher
            .set_body(download, b"<html>Access denied</html>".to_vec())
            .await;

        let err = resolver(fetcher.clone(), &dir, ImageLinkMode::Upload)
            .resolve("https://drive.google.com/open?id=FILE2", None)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaFetchError::Fetch { attempts: 1, .. }));
        assert!(err.to_string().contains("HTML returned instead of media"));
    }

    #[tokio::test]
    async fn test_probe_links_image_without_download() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let url = "https://cdn.example.com/banner.jpg";
        fetcher.set_body(url, b"jpeg".to_vec()).await;

        let item = resolver(fetcher.clone(), &dir, ImageLinkMode::LinkWithProbe)
            .resolve(url, None)
            .await
            .unwrap();

        assert!(matches!(item.location, MediaLocation::Url(ref u) if u == url));
        assert_eq!(fetcher.fetch_count(url).await, 0);
    }

    #[tokio::test]
    async fn test_failed_probe_falls_back_to_download() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let url = "https://cdn.example.com/banner.jpg";
        fetcher.set_body(url, b"jpeg".to_vec()).await;
        fetcher
            .set_probe_error(url, FetchError::Permanent("HTTP 405".to_string()))
            .await;

        let item = resolver(fetcher.clone(), &dir, ImageLinkMode::LinkWithProbe)
            .resolve(url, None)
            .await
            .unwrap();

        assert!(matches!(item.location, MediaLocation::File(_)));
        assert_eq!(fetcher.fetch_count(url).await, 1);
        item.release().await;
    }

    #[tokio::test]
    async fn test_local_file_is_borrowed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.mp4");
        std::fs::write(&path, b"video").unwrap();
        let fetcher = Arc::new(MockFetcher::new());

        let item = resolver(fetcher, &dir, ImageLinkMode::Upload)
            .resolve(path.to_str().unwrap(), None)
            .await
            .unwrap();

        assert_eq!(item.source, SourceClass::Local);
        assert_eq!(item.kind, MediaKind::Video);
        item.release().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = TempDir::new().unwrap();
        let err = resolver(Arc::new(MockFetcher::new()), &dir, ImageLinkMode::Upload)
            .resolve("/definitely/not/here.jpg", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaFetchError::LocalFileMissing(_)));
    }
}
