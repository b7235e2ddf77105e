//! Single-item issue endpoints
//!
//! Both endpoints are idempotent: posting the same source item twice returns
//! the existing issue with `"ignored"` instead of creating a duplicate.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::models::{IssueOutcome, SourceKind};
use crate::AppState;

/// Request for POST /generate-for-article
#[derive(Debug, Deserialize)]
pub struct ArticleIssueRequest {
    pub article_id: i64,
}

/// Request for POST /generate-for-community
#[derive(Debug, Deserialize)]
pub struct CommunityIssueRequest {
    pub community_post_id: i64,
}

/// Response for both issue endpoints
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    /// "success" when created, "ignored" when the issue already existed
    pub status: String,
    pub issue_id: i64,
}

/// POST /generate-for-article
pub async fn generate_for_article(
    State(state): State<AppState>,
    Json(request): Json<ArticleIssueRequest>,
) -> ApiResult<Json<IssueResponse>> {
    respond(&state, SourceKind::Rss, request.article_id).await
}

/// POST /generate-for-community
pub async fn generate_for_community(
    State(state): State<AppState>,
    Json(request): Json<CommunityIssueRequest>,
) -> ApiResult<Json<IssueResponse>> {
    respond(&state, SourceKind::Community, request.community_post_id).await
}

async fn respond(state: &AppState, kind: SourceKind, source_id: i64) -> ApiResult<Json<IssueResponse>> {
    let outcome = match state.engine.process_issue(kind, source_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(kind = kind.as_str(), source_id, error = %e, "Issue generation failed");
            *state.last_error.write().await = Some(e.to_string());
            return Err(e.into());
        }
    };

    match outcome {
        IssueOutcome::Created(issue_id) => Ok(Json(IssueResponse {
            status: "success".to_string(),
            issue_id,
        })),
        IssueOutcome::Existing(issue_id) => Ok(Json(IssueResponse {
            status: "ignored".to_string(),
            issue_id,
        })),
        IssueOutcome::NotFound => Err(ApiError::NotFound(format!(
            "{} source {} not found",
            kind.as_str(),
            source_id
        ))),
    }
}

/// Build issue routes
pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-for-article", post(generate_for_article))
        .route("/generate-for-community", post(generate_for_community))
}
