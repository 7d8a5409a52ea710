//! Ads platform client contract.
//!
//! The saga talks to the remote advertising platform only through the
//! [`AdsPlatform`] trait. [`GraphApiClient`] is the HTTP implementation;
//! tests use `testing::MockAdsPlatform`.

mod graph;
mod types;

pub use graph::{GraphApiClient, GraphApiConfig};
pub use types::*;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::Retryable;

/// Graph error codes that signal throttling or a temporary outage.
const TRANSIENT_API_CODES: &[i64] = &[1, 2, 4, 17, 32, 341, 613];

/// Errors returned by platform calls, classified for the retry executor.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    /// Worth retrying: network failure, 5xx, rate limit.
    #[error("Transient platform error: {message}")]
    Transient { message: String, code: Option<i64> },

    /// Not worth retrying: validation, auth or business-rule rejection.
    #[error("Platform rejected request: {message}")]
    Permanent {
        message: String,
        status: Option<u16>,
        code: Option<i64>,
        subcode: Option<i64>,
    },

    /// The attempt exceeded its deadline.
    #[error("Platform call timed out after {0:?}")]
    Timeout(Duration),

    /// A local media file could not be read for upload.
    #[error("Cannot read media file: {0}")]
    Io(String),
}

impl PlatformError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            code: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            status: None,
            code: None,
            subcode: None,
        }
    }

    /// Classify a Graph API error payload.
    pub fn from_api(
        status: u16,
        code: Option<i64>,
        subcode: Option<i64>,
        is_transient: bool,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let transient_code = code.is_some_and(|c| {
            TRANSIENT_API_CODES.contains(&c) || (80000..=80014).contains(&c)
        });

        if is_transient || transient_code || status == 429 || status >= 500 {
            Self::Transient { message, code }
        } else {
            Self::Permanent {
                message,
                status: Some(status),
                code,
                subcode,
            }
        }
    }
}

impl Retryable for PlatformError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout(_))
    }

    fn timed_out(after: Duration) -> Self {
        Self::Timeout(after)
    }
}

/// Remote advertising platform.
///
/// Every call either returns the id of the created resource or a classified
/// [`PlatformError`]. Deadlines are enforced by the caller.
#[async_trait]
pub trait AdsPlatform: Send + Sync {
    async fn create_campaign(
        &self,
        account_id: &str,
        params: &CampaignParams,
    ) -> Result<String, PlatformError>;

    async fn create_ad_set(
        &self,
        account_id: &str,
        params: &AdSetParams,
    ) -> Result<String, PlatformError>;

    async fn create_creative(
        &self,
        account_id: &str,
        params: &CreativeParams,
    ) -> Result<String, PlatformError>;

    async fn create_ad(&self, account_id: &str, params: &AdParams)
        -> Result<String, PlatformError>;

    /// Upload an image to the account library. Returns the image hash.
    async fn create_image(&self, account_id: &str, file: &Path) -> Result<String, PlatformError>;

    /// Upload a video to the account library. Returns the video id.
    async fn create_video(&self, account_id: &str, file: &Path) -> Result<String, PlatformError>;

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_server_errors_as_transient() {
        assert!(PlatformError::from_api(500, None, None, false, "boom").is_transient());
        assert!(PlatformError::from_api(503, Some(100), None, false, "down").is_transient());
        assert!(PlatformError::from_api(429, None, None, false, "slow down").is_transient());
    }

    #[test]
    fn test_classify_throttling_codes_as_transient() {
        assert!(PlatformError::from_api(400, Some(17), None, false, "limit").is_transient());
        assert!(PlatformError::from_api(400, Some(80004), None, false, "limit").is_transient());
        assert!(PlatformError::from_api(400, Some(100), None, true, "flag").is_transient());
    }

    #[test]
    fn test_classify_business_errors_as_permanent() {
        let err = PlatformError::from_api(400, Some(100), Some(1487), false, "invalid");
        assert!(!err.is_transient());
        match err {
            PlatformError::Permanent {
                status,
                code,
                subcode,
                ..
            } => {
                assert_eq!(status, Some(400));
                assert_eq!(code, Some(100));
                assert_eq!(subcode, Some(1487));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!PlatformError::from_api(401, Some(190), None, false, "token").is_transient());
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(PlatformError::timed_out(Duration::from_secs(1)).is_transient());
        assert!(!PlatformError::Io("missing".to_string()).is_transient());
    }
}
