//! Title batch endpoint
//!
//! One POST runs the whole enrichment batch synchronously and reports the
//! aggregate. Per-item failures are part of the report, never an HTTP error;
//! the endpoint only fails when the batch itself cannot run.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::error;

use crate::error::ApiResult;
use crate::models::FailedTitle;
use crate::AppState;

/// Batch summary counters
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
}

/// Response for POST /generate-ai-titles
#[derive(Debug, Serialize)]
pub struct TitleBatchResponse {
    pub status: String,
    pub message: String,
    pub summary: BatchSummary,
    pub failed_articles: Vec<FailedTitle>,
}

/// POST /generate-ai-titles
pub async fn generate_ai_titles(State(state): State<AppState>) -> ApiResult<Json<TitleBatchResponse>> {
    let report = match state.engine.run_title_batch().await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Title batch failed to run");
            *state.last_error.write().await = Some(e.to_string());
            return Err(e.into());
        }
    };

    let message = format!(
        "AI title generation finished: {} succeeded, {} failed, {} skipped",
        report.success_count, report.failed_count, report.skipped_count
    );

    Ok(Json(TitleBatchResponse {
        status: "completed".to_string(),
        message,
        summary: BatchSummary {
            success_count: report.success_count,
            failed_count: report.failed_count,
            skipped_count: report.skipped_count,
        },
        failed_articles: report.failed_articles,
    }))
}

/// Build title routes
pub fn title_routes() -> Router<AppState> {
    Router::new().route("/generate-ai-titles", post(generate_ai_titles))
}
