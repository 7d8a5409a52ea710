//! Media reference classification.
//!
//! Decides the media kind and source class of a raw reference string
//! without touching the network.

use std::path::{Path, PathBuf};

use url::Url;

use super::error::MediaFetchError;
use super::types::{MediaKind, SourceClass};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "wmv", "flv", "webm", "mkv", "m4v"];

const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "wistia.com",
    "dailymotion.com",
];

const CLOUD_STORAGE_HOSTS: &[&str] = &[
    "storage.googleapis.com",
    "cloudfront.net",
    "amazonaws.com",
    "blob.core.windows.net",
];

const SHARED_DRIVE_HOSTS: &[&str] = &["drive.google.com", "docs.google.com"];

/// Query keys that sometimes carry the real file name.
const FILE_NAME_QUERY_KEYS: &[&str] = &["file", "filename", "name", "video"];

/// Where to fetch a classified reference from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Url(String),
    Path(PathBuf),
}

/// A classified media reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub raw: String,
    pub kind: MediaKind,
    pub source: SourceClass,
    pub target: ReferenceTarget,
    /// Lowercased file extension, when one could be found.
    pub extension: Option<String>,
}

/// Classify a raw reference.
///
/// Kind precedence: explicit hint, video hosts and `/video/` patterns,
/// extension table, platform CDN markers, then image.
pub fn classify(raw: &str, hint: Option<MediaKind>) -> Result<MediaReference, MediaFetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MediaFetchError::invalid(raw, "empty reference"));
    }

    let lower = trimmed.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        let path = PathBuf::from(trimmed.strip_prefix("file://").unwrap_or(trimmed));
        let extension = path_extension(&path);
        let kind = hint
            .or_else(|| extension.as_deref().and_then(kind_for_extension))
            .unwrap_or(MediaKind::Image);
        return Ok(MediaReference {
            raw: trimmed.to_string(),
            kind,
            source: SourceClass::Local,
            target: ReferenceTarget::Path(path),
            extension,
        });
    }

    let url = Url::parse(trimmed).map_err(|e| MediaFetchError::invalid(trimmed, e.to_string()))?;
    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| MediaFetchError::invalid(trimmed, "URL has no host"))?;

    let source = if host_in(&host, SHARED_DRIVE_HOSTS) {
        SourceClass::SharedDrive
    } else if host_in(&host, CLOUD_STORAGE_HOSTS) {
        SourceClass::CloudStorage
    } else {
        SourceClass::Direct
    };

    let extension = url_extension(&url);
    let kind = hint
        .or_else(|| is_video_pattern(&host, &url).then_some(MediaKind::Video))
        .or_else(|| extension.as_deref().and_then(kind_for_extension))
        .or_else(|| is_platform_cdn_video(&host, &url).then_some(MediaKind::Video))
        .unwrap_or(MediaKind::Image);

    let target = match source {
        SourceClass::SharedDrive => {
            let id = drive_file_id(&url).ok_or_else(|| {
                MediaFetchError::invalid(trimmed, "no file id in shared-drive link")
            })?;
            ReferenceTarget::Url(drive_download_url(&id))
        }
        _ => ReferenceTarget::Url(trimmed.to_string()),
    };

    Ok(MediaReference {
        raw: trimmed.to_string(),
        kind,
        source,
        target,
        extension,
    })
}

/// Extract the file id from a shared-drive link.
///
/// Supports `/file/d/<id>/...` (and the docs `/<type>/d/<id>` variant),
/// `?id=<id>` and the `key=<id>` sharing variant.
pub fn drive_file_id(url: &Url) -> Option<String> {
    if let Some(segments) = url.path_segments() {
        let segments: Vec<&str> = segments.collect();
        for window in segments.windows(2) {
            if window[0] == "d" && is_drive_id(window[1]) {
                return Some(window[1].to_string());
            }
        }
    }

    for key in ["id", "key"] {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == key) {
            if is_drive_id(&value) {
                return Some(value.into_owned());
            }
        }
    }

    None
}

/// Direct-download URL for a shared-drive file id.
pub fn drive_download_url(id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", id)
}

fn is_drive_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn host_in(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

fn kind_for_extension(extension: &str) -> Option<MediaKind> {
    if VIDEO_EXTENSIONS.contains(&extension) {
        Some(MediaKind::Video)
    } else if IMAGE_EXTENSIONS.contains(&extension) {
        Some(MediaKind::Image)
    } else {
        None
    }
}

fn known_extension(candidate: &str) -> Option<String> {
    let (_, ext) = candidate.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    kind_for_extension(&ext).map(|_| ext)
}

fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn url_extension(url: &Url) -> Option<String> {
    let from_path = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(known_extension);

    from_path.or_else(|| {
        url.query_pairs()
            .filter(|(k, _)| FILE_NAME_QUERY_KEYS.contains(&&**k))
            .find_map(|(_, v)| known_extension(&v))
    })
}

fn is_video_pattern(host: &str, url: &Url) -> bool {
    if host_in(host, VIDEO_HOSTS) {
        return true;
    }

    let path = url.path().to_ascii_lowercase();
    if path.contains("/video/") || path.contains("/videos/") {
        return true;
    }

    url.query_pairs().any(|(k, v)| {
        let v = v.to_ascii_lowercase();
        v.contains("/video/")
            || (matches!(&*k, "type" | "media_type" | "mediatype") && v == "video")
    })
}

fn is_platform_cdn_video(host: &str, url: &Url) -> bool {
    if !host_in(host, &["fbcdn.net"]) {
        return false;
    }
    let path = url.path().to_ascii_lowercase();
    path.contains("/v/t42")
        || path.contains("/o1/v/")
        || path.contains("video")
        || url
            .query()
            .is_some_and(|q| q.to_ascii_lowercase().contains("video"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> MediaKind {
        classify(raw, None).unwrap().kind
    }

    #[test]
    fn test_hint_overrides_heuristics() {
        let reference = classify("https://example.com/clip.mp4", Some(MediaKind::Image)).unwrap();
        assert_eq!(reference.kind, MediaKind::Image);
    }

    #[test]
    fn test_video_hosts_and_paths() {
        assert_eq!(kind_of("https://vimeo.com/12345"), MediaKind::Video);
        assert_eq!(kind_of("https://cdn.example.com/video/abc"), MediaKind::Video);
        assert_eq!(kind_of("https://example.com/get?type=video&id=3"), MediaKind::Video);
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(kind_of("https://example.com/a/b/clip.MOV"), MediaKind::Video);
        assert_eq!(kind_of("https://example.com/a/b/photo.png"), MediaKind::Image);
        assert_eq!(kind_of("https://example.com/dl?filename=promo.webm"), MediaKind::Video);
    }

    #[test]
    fn test_platform_cdn_markers() {
        assert_eq!(
            kind_of("https://video.xx.fbcdn.net/v/t42.1790-2/12345_n?_nc_cat=1"),
            MediaKind::Video
        );
        assert_eq!(
            kind_of("https://scontent.xx.fbcdn.net/v/t39.30808-6/12345_n?stp=dst"),
            MediaKind::Image
        );
    }

    #[test]
    fn test_defaults_to_image() {
        assert_eq!(kind_of("https://example.com/asset/12345"), MediaKind::Image);
    }

    #[test]
    fn test_source_classes() {
        let cloud = classify("https://bucket.s3.amazonaws.com/a.jpg", None).unwrap();
        assert_eq!(cloud.source, SourceClass::CloudStorage);
        assert_eq!(
            cloud.target,
            ReferenceTarget::Url("https://bucket.s3.amazonaws.com/a.jpg".to_string())
        );

        let gcs = classify("https://storage.googleapis.com/b/v.mp4", None).unwrap();
        assert_eq!(gcs.source, SourceClass::CloudStorage);

        let direct = classify("https://example.com/a.jpg", None).unwrap();
        assert_eq!(direct.source, SourceClass::Direct);

        let local = classify("/tmp/media/clip.mp4", None).unwrap();
        assert_eq!(local.source, SourceClass::Local);
        assert_eq!(local.kind, MediaKind::Video);
        assert_eq!(local.target, ReferenceTarget::Path(PathBuf::from("/tmp/media/clip.mp4")));
    }

    #[test]
    fn test_drive_file_path_variant() {
        let reference =
            classify("https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing", None).unwrap();
        assert_eq!(reference.source, SourceClass::SharedDrive);
        assert_eq!(
            reference.target,
            ReferenceTarget::Url(
                "https://drive.google.com/uc?export=download&id=1AbC_d-9".to_string()
            )
        );
    }

    #[test]
    fn test_drive_id_query_variants() {
        let open = Url::parse("https://drive.google.com/open?id=XYZ123").unwrap();
        assert_eq!(drive_file_id(&open).as_deref(), Some("XYZ123"));

        let uc = Url::parse("https://drive.google.com/uc?id=XYZ123&export=download").unwrap();
        assert_eq!(drive_file_id(&uc).as_deref(), Some("XYZ123"));

        let sharing =
            Url::parse("https://drive.google.com/drive/folders/sharing?key=KEY_42").unwrap();
        assert_eq!(drive_file_id(&sharing).as_deref(), Some("KEY_42"));

        let docs = Url::parse("https://docs.google.com/presentation/d/DOC9/edit").unwrap();
        assert_eq!(drive_file_id(&docs).as_deref(), Some("DOC9"));
    }

    #[test]
    fn test_drive_link_without_id_is_invalid() {
        let err = classify("https://drive.google.com/drive/my-drive", None).unwrap_err();
        assert!(matches!(err, MediaFetchError::InvalidReference { .. }));
    }

    #[test]
    fn test_empty_reference_is_invalid() {
        assert!(classify("   ", None).is_err());
    }
}
