//! Testing utilities and mock implementations.
//!
//! Mocks for the two external seams (the ads platform and HTTP downloads)
//! plus fixtures that wire a complete saga runner against them, so sagas can
//! be exercised end to end without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use uploader_core::testing::{fixtures, MockAdsPlatform, MockFetcher};
//!
//! let platform = Arc::new(MockAdsPlatform::new());
//! let fetcher = Arc::new(MockFetcher::new());
//! fetcher.set_body("https://cdn.test/a.jpg", fixtures::JPEG_BYTES.to_vec()).await;
//!
//! let runner = fixtures::saga_runner(platform.clone(), fetcher, temp.path());
//! let report = runner.run_saga(&fixtures::task(2, vec!["https://cdn.test/a.jpg"])).await;
//! ```

mod mock_fetcher;
mod mock_platform;

pub use mock_fetcher::MockFetcher;
pub use mock_platform::{MockAdsPlatform, PlatformCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use super::{MockAdsPlatform, MockFetcher};
    use crate::campaign::{
        campaign_name, CampaignSpec, FieldMap, PlatformTarget, SourceRow, TargetingConfig,
        UploadTask,
    };
    use crate::media::{MediaConfig, MediaResolver};
    use crate::retry::{RetryExecutor, RetryPolicy, RetryPolicyTable};
    use crate::saga::{CreationDefaults, SagaRunner};
    use crate::thumbnail::{ThumbnailConfig, ThumbnailExtractor};

    /// Platform key used by every fixture task.
    pub const PLATFORM_KEY: &str = "fb api";
    pub const ACCOUNT_ID: &str = "123";
    pub const PAGE_ID: &str = "456";
    pub const LANDING_PREFIX: &str = "https://land.test/?channel=ABC1&q=";
    pub const DISPLAY_DATE: &str = "16-10";

    /// JPEG start-of-image marker and a JFIF header. Enough for extension-
    /// and size-based checks; not a decodable picture.
    pub const JPEG_BYTES: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
    ];

    /// Three attempts, 5s base deadline, no pause between attempts.
    pub fn fast_retry() -> RetryExecutor {
        let policy = RetryPolicy::new(3, Duration::from_secs(5), Duration::from_secs(1))
            .with_pause(Duration::ZERO);
        RetryExecutor::new(RetryPolicyTable::uniform(policy))
    }

    /// An unregulated (GB) task for the fixture platform.
    pub fn task(row_id: u32, media: Vec<&str>) -> UploadTask {
        let spec = CampaignSpec::new(
            "Running Shoes",
            "GB",
            "Find Running Shoes",
            "Compare the best running shoes near you.",
            "running shoes",
            media.into_iter().map(str::to_string).collect(),
        );
        UploadTask {
            row_id,
            campaign_name: campaign_name(&spec.topic, "GB", "A", DISPLAY_DATE, None),
            spec,
            platform: PLATFORM_KEY.to_string(),
            account_id: ACCOUNT_ID.to_string(),
            page_id: PAGE_ID.to_string(),
            pixel_id: None,
            social_identity_id: None,
        }
    }

    /// Planner target matching [`task`].
    pub fn platform_target() -> PlatformTarget {
        PlatformTarget {
            key: PLATFORM_KEY.to_string(),
            account_id: ACCOUNT_ID.to_string(),
            page_id: PAGE_ID.to_string(),
            pixel_id: None,
            social_identity_id: None,
        }
    }

    /// Creation defaults with the fixture landing prefix.
    pub fn creation_defaults() -> CreationDefaults {
        CreationDefaults::default().with_landing_page_prefix(LANDING_PREFIX)
    }

    /// Saga runner wired to the mocks, with scratch space under `temp`.
    pub fn saga_runner(
        platform: Arc<MockAdsPlatform>,
        fetcher: Arc<MockFetcher>,
        temp: &Path,
    ) -> SagaRunner {
        saga_runner_with_targeting(platform, fetcher, temp, TargetingConfig::default())
    }

    pub fn saga_runner_with_targeting(
        platform: Arc<MockAdsPlatform>,
        fetcher: Arc<MockFetcher>,
        temp: &Path,
        targeting: TargetingConfig,
    ) -> SagaRunner {
        let resolver = MediaResolver::new(
            fetcher,
            fast_retry(),
            MediaConfig::default().with_temp_dir(temp.join("media")),
        );
        let thumbnails = ThumbnailExtractor::new(
            ThumbnailConfig::default()
                .with_temp_dir(temp.join("thumbnails"))
                .without_ffmpeg(),
        );
        SagaRunner::new(
            fast_retry(),
            Arc::new(resolver),
            Arc::new(thumbnails),
            creation_defaults(),
            targeting,
        )
        .with_platform(PLATFORM_KEY, platform)
    }

    /// A source row built from `(column, value)` pairs.
    pub fn source_row(row_id: u32, cells: &[(&str, &str)]) -> SourceRow {
        let fields: FieldMap = cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SourceRow::new(row_id, fields)
    }

    /// A complete row marked for upload on the fixture platform.
    pub fn marked_row(row_id: u32, topic: &str, country: &str, media: &str) -> SourceRow {
        source_row(
            row_id,
            &[
                ("Topic", topic),
                ("Country", country),
                ("Title", "Find Deals"),
                ("Body", "Compare offers near you."),
                ("Query", topic),
                ("Media", media),
                ("Upload", "yes"),
                ("Platform", PLATFORM_KEY),
            ],
        )
    }
}
