//! Media resolution errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::retry::{RetryError, Retryable};

/// Failure of a single fetch attempt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Network failure, 5xx, rate limit or empty body.
    #[error("{0}")]
    Transient(String),

    /// 4xx, interstitial page or unusable body.
    #[error("{0}")]
    Permanent(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Classify an HTTP status that is not a success.
    pub fn from_status(status: u16) -> Self {
        if status == 429 || status == 408 || status >= 500 {
            FetchError::Transient(format!("HTTP {}", status))
        } else {
            FetchError::Permanent(format!("HTTP {}", status))
        }
    }
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Permanent(_))
    }

    fn timed_out(after: Duration) -> Self {
        FetchError::Timeout(after)
    }
}

/// Errors that can occur while resolving a media reference.
#[derive(Debug, Error)]
pub enum MediaFetchError {
    /// The reference cannot be turned into a fetchable location.
    #[error("Invalid media reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Local reference that does not exist on disk.
    #[error("Local media file not found: {0}")]
    LocalFileMissing(PathBuf),

    /// Every fetch attempt failed.
    #[error("Failed to fetch '{reference}' after {attempts} attempt(s): {reason}")]
    Fetch {
        reference: String,
        attempts: u32,
        reason: String,
    },

    /// Temp directory or file handling failed.
    #[error("I/O error for '{reference}': {reason}")]
    Io { reference: String, reason: String },
}

impl MediaFetchError {
    pub fn invalid(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_retry(reference: &str, err: RetryError<FetchError>) -> Self {
        Self::Fetch {
            reference: reference.to_string(),
            attempts: err.attempts,
            reason: err.last_error.to_string(),
        }
    }

    pub(crate) fn io(reference: &str, err: std::io::Error) -> Self {
        Self::Io {
            reference: reference.to_string(),
            reason: err.to_string(),
        }
    }
}
