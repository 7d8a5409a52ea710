//! Batch summary notifiers.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Notifier misconfigured: {0}")]
    Config(String),

    #[error("Notification request failed: {0}")]
    Http(String),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Receives a free-text summary after a batch completes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifierError>;
}

/// Logs the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifierError> {
        info!(summary = message, "Batch summary");
        Ok(())
    }
}
