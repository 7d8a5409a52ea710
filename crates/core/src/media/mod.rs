//! Media resolution.
//!
//! Classifies raw media references (direct URLs, cloud-storage objects,
//! shared-drive links, local paths), downloads them through the retry
//! executor and hands back [`MediaItem`]s that own their temporary files.

mod classify;
mod error;
mod fetcher;
mod resolver;
mod types;

pub use classify::{classify, drive_download_url, drive_file_id, MediaReference, ReferenceTarget};
pub use error::{FetchError, MediaFetchError};
pub use fetcher::{FetchedFile, HttpFetcher, ReqwestFetcher};
pub use resolver::MediaResolver;
pub use types::{
    ImageLinkMode, MediaArtifact, MediaConfig, MediaItem, MediaKind, MediaLocation, SourceClass,
};
