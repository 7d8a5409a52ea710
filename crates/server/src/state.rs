use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use uploader_core::report::SqliteResultSink;
use uploader_core::{BatchUploader, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    uploader: Arc<BatchUploader>,
    results: Arc<SqliteResultSink>,
    /// Held while a batch runs; one batch at a time.
    batch_gate: Mutex<()>,
}

impl AppState {
    pub fn new(
        config: Config,
        uploader: Arc<BatchUploader>,
        results: Arc<SqliteResultSink>,
    ) -> Self {
        Self {
            config,
            uploader,
            results,
            batch_gate: Mutex::new(()),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn uploader(&self) -> &BatchUploader {
        self.uploader.as_ref()
    }

    pub fn results(&self) -> &SqliteResultSink {
        self.results.as_ref()
    }

    /// Claim the batch slot, or `None` when a batch is already running.
    pub fn try_start_batch(&self) -> Option<MutexGuard<'_, ()>> {
        self.batch_gate.try_lock().ok()
    }
}
