//! Batch API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uploader_core::report::{JsonRowSource, RowSource};
use uploader_core::BatchReport;

use super::ErrorResponse;
use crate::metrics::{BATCHES_TOTAL, BATCH_TASKS_TOTAL};
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Array of field maps, or of `{row, fields}` objects.
    pub rows: Value,
    /// `DD-MM` stamp used in campaign names; defaults to today.
    #[serde(default)]
    pub display_date: Option<String>,
    /// Overrides the configured pool size for this batch.
    #[serde(default)]
    pub pool_size: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/batches
///
/// Plan the rows, upload every selected task and return the batch report.
/// Responds once the batch has finished.
pub async fn run_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    if request.pool_size == Some(0) {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "pool_size must be at least 1",
        ));
    }

    let source = JsonRowSource::from_value(request.rows)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let rows = source
        .rows()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let Some(_guard) = state.try_start_batch() else {
        BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
        return Err(error(
            StatusCode::CONFLICT,
            "A batch is already running",
        ));
    };

    info!(rows = rows.len(), "Batch requested");
    let report = state
        .uploader()
        .run_batch(&rows, request.display_date.as_deref(), request.pool_size)
        .await;

    BATCHES_TOTAL.with_label_values(&["completed"]).inc();
    BATCH_TASKS_TOTAL
        .with_label_values(&["success"])
        .inc_by(report.succeeded as u64);
    BATCH_TASKS_TOTAL
        .with_label_values(&["failed"])
        .inc_by(report.failed as u64);

    Ok(Json(report))
}
