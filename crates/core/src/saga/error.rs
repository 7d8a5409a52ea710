//! Saga and item error taxonomy.

use thiserror::Error;

use crate::campaign::ValidationError;
use crate::media::MediaFetchError;
use crate::platform::{PlatformError, ResourceKind};
use crate::retry::RetryError;

/// Errors that end a saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Spec is missing a required field. No remote call was made.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Creating a hierarchy resource failed after retries.
    #[error("Failed to create {stage}: {source}")]
    Remote {
        stage: ResourceKind,
        #[source]
        source: RetryError<PlatformError>,
    },

    /// No item produced an ad.
    #[error("Saga aborted: {reason}")]
    Aborted { reason: String },

    /// The task names a platform with no configured client.
    #[error("No client configured for platform '{0}'")]
    UnknownPlatform(String),
}

impl SagaError {
    pub fn remote(stage: ResourceKind, source: RetryError<PlatformError>) -> Self {
        Self::Remote { stage, source }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Whether the error was raised before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownPlatform(_))
    }
}

/// Failure of one media item. Never fatal to the saga on its own.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("media: {0}")]
    Media(#[from] MediaFetchError),

    #[error("upload: {0}")]
    Upload(RetryError<PlatformError>),

    #[error("creative: {0}")]
    Creative(RetryError<PlatformError>),

    #[error("ad: {0}")]
    Ad(RetryError<PlatformError>),
}

impl ItemError {
    /// Label of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            ItemError::Media(_) => "resolve",
            ItemError::Upload(_) => "upload",
            ItemError::Creative(_) => "creative",
            ItemError::Ad(_) => "ad",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::OperationClass;

    #[test]
    fn test_messages() {
        let err = SagaError::remote(
            ResourceKind::AdSet,
            RetryError {
                operation: OperationClass::CreateAdSet,
                attempts: 1,
                last_error: PlatformError::permanent("Invalid targeting"),
            },
        );
        let message = err.to_string();
        assert!(message.starts_with("Failed to create ad_set"));
        assert!(message.contains("Invalid targeting"));

        let err: SagaError = ValidationError::missing("title").into();
        assert_eq!(err.to_string(), "Missing required field: title");
        assert!(err.is_validation());
        assert!(!SagaError::aborted("no ads created").is_validation());
    }

    #[test]
    fn test_item_stage_labels() {
        let err = ItemError::Media(MediaFetchError::invalid("x", "bad"));
        assert_eq!(err.stage(), "resolve");
        let err = ItemError::Ad(RetryError {
            operation: OperationClass::CreateAd,
            attempts: 3,
            last_error: PlatformError::transient("busy"),
        });
        assert_eq!(err.stage(), "ad");
        assert!(err.to_string().starts_with("ad: create_ad failed after 3"));
    }
}
