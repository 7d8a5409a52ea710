//! Result sinks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::campaign::{TaskStatus, UploadResult};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(String),
}

/// A stored result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedResult {
    pub id: i64,
    pub batch_id: String,
    pub row_id: u32,
    pub status: TaskStatus,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

/// Accepts the results of a batch for persistence or reporting.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, batch_id: &str, results: &[UploadResult]) -> Result<(), SinkError>;
}

/// Writes each result to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingResultSink;

#[async_trait]
impl ResultSink for TracingResultSink {
    async fn record(&self, batch_id: &str, results: &[UploadResult]) -> Result<(), SinkError> {
        for result in results {
            info!(
                batch = batch_id,
                row = result.row_id,
                status = %result.status,
                detail = %result.detail,
                "Upload result"
            );
        }
        Ok(())
    }
}
