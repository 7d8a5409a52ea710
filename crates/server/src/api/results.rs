//! Result history API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uploader_core::report::RecordedResult;

use super::ErrorResponse;
use crate::state::AppState;

/// Largest page served.
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct ResultsQueryParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Restrict to one batch.
    #[serde(default)]
    pub batch_id: Option<String>,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<RecordedResult>,
    pub total: usize,
}

/// GET /api/v1/results
///
/// Recorded results, newest first, or one batch in row order.
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResultsQueryParams>,
) -> Result<Json<ResultsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let sink = state.results();
    let outcome = match &params.batch_id {
        Some(batch_id) => sink.batch(batch_id),
        None => sink.recent(params.limit.min(MAX_LIMIT)),
    };

    match outcome {
        Ok(results) => {
            let total = results.len();
            Ok(Json(ResultsResponse { results, total }))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
