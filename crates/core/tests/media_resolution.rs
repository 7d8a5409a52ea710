//! Media resolution integration tests.
//!
//! Reference shapes through classification and download against the mock
//! fetcher: shared-drive variants, cloud storage, hints and local files.

use std::sync::Arc;

use tempfile::TempDir;

use uploader_core::{
    media::{
        classify, FetchError, ImageLinkMode, MediaConfig, MediaKind, MediaResolver, SourceClass,
    },
    testing::{fixtures, MockFetcher},
};

fn resolver(fetcher: Arc<MockFetcher>, dir: &TempDir) -> MediaResolver {
    MediaResolver::new(
        fetcher,
        fixtures::fast_retry(),
        MediaConfig::default()
            .with_temp_dir(dir.path().join("media"))
            .with_image_link_mode(ImageLinkMode::Upload),
    )
}

#[tokio::test]
async fn test_shared_drive_shapes_fetch_the_same_file() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let download = "https://drive.google.com/uc?export=download&id=1AbC-d_9";
    fetcher.set_body(download, b"drive-image".to_vec()).await;
    let resolver = resolver(fetcher.clone(), &dir);

    let shapes = [
        "https://drive.google.com/file/d/1AbC-d_9/view?usp=sharing",
        "https://drive.google.com/open?id=1AbC-d_9",
        "https://drive.google.com/drive/folders?key=1AbC-d_9",
    ];
    for shape in shapes {
        let item = resolver.resolve(shape, None).await.unwrap();
        assert_eq!(item.source, SourceClass::SharedDrive, "{shape}");
        assert_eq!(
            std::fs::read(item.artifact_path().unwrap()).unwrap(),
            b"drive-image"
        );
        item.release().await;
    }

    assert_eq!(fetcher.fetch_count(download).await, 3);
}

#[tokio::test]
async fn test_cloud_storage_url_is_fetched_unmodified() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let url = "https://storage.googleapis.com/bucket/creatives/clip.mp4?generation=7";
    fetcher.set_body(url, b"video-bytes".to_vec()).await;

    let item = resolver(fetcher.clone(), &dir).resolve(url, None).await.unwrap();

    assert_eq!(item.source, SourceClass::CloudStorage);
    assert_eq!(item.kind, MediaKind::Video);
    assert_eq!(fetcher.fetch_count(url).await, 1);
    let path = item.artifact_path().unwrap().to_path_buf();
    assert_eq!(path.extension().unwrap(), "mp4");
    item.release().await;
    assert!(!path.exists());
}

#[tokio::test]
async fn test_hint_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let url = "https://cdn.test/poster.jpg";
    fetcher.set_body(url, b"actually a video".to_vec()).await;

    let item = resolver(fetcher, &dir)
        .resolve(url, Some(MediaKind::Video))
        .await
        .unwrap();

    assert_eq!(item.kind, MediaKind::Video);
    item.release().await;
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let url = "https://cdn.test/flaky.png";
    fetcher
        .push_error(url, FetchError::Transient("HTTP 502".to_string()))
        .await;
    fetcher
        .push_error(url, FetchError::Transient("HTTP 503".to_string()))
        .await;
    fetcher.set_body(url, b"png".to_vec()).await;

    let item = resolver(fetcher.clone(), &dir).resolve(url, None).await.unwrap();

    assert_eq!(fetcher.fetch_count(url).await, 3);
    item.release().await;
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let url = "https://cdn.test/gone.png";

    let result = resolver(fetcher.clone(), &dir).resolve(url, None).await;

    assert!(result.is_err());
    assert_eq!(fetcher.fetch_count(url).await, 1);
}

#[test]
fn test_classification_order() {
    let video_host = classify("https://vimeo.com/123456", None).unwrap();
    assert_eq!(video_host.kind, MediaKind::Video);

    let video_path = classify("https://cdn.test/video/banner.png", None).unwrap();
    assert_eq!(video_path.kind, MediaKind::Video);

    let extensionless = classify("https://cdn.test/assets/12345", None).unwrap();
    assert_eq!(extensionless.kind, MediaKind::Image);

    let local = classify("/srv/media/clip.MOV", None).unwrap();
    assert_eq!(local.source, SourceClass::Local);
    assert_eq!(local.kind, MediaKind::Video);
}
