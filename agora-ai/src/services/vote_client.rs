//! Outbound client for the external vote system
//!
//! Vote data is owned entirely by the external system: this service only
//! checks whether a vote already exists for an issue and submits at most one
//! creation request per issue. The create call is fire-and-forget; its
//! response is logged and never alters local state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Default timeout for vote-system requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// One option of a proposed vote, with its resolvable choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOptionRequest {
    pub title: String,
    /// "YES" / "NO", plus "DRAW" for YES_NO_DRAW votes
    pub choices: Vec<String>,
}

/// Resolution rule of a proposed vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRuleRequest {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub description: String,
}

/// Creation request submitted to the vote system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCreateRequest {
    pub issue_id: i64,
    pub question: String,
    pub options: Vec<VoteOptionRequest>,
    pub result_type: String,
    pub end_at: DateTime<Utc>,
    pub rule: VoteRuleRequest,
    pub initial_status: String,
    pub fee_rate: f64,
}

/// External vote system interface
#[async_trait]
pub trait VoteApi: Send + Sync {
    /// Whether a vote has already been created for this issue
    async fn exists_for_issue(&self, issue_id: i64) -> Result<bool>;

    /// Submit one vote creation request; the response body is logged only
    async fn create(&self, request: &VoteCreateRequest) -> Result<()>;
}

/// HTTP client for the vote system's REST API
pub struct HttpVoteClient {
    http_client: Client,
    base_url: String,
}

impl HttpVoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .default_headers(headers)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[async_trait]
impl VoteApi for HttpVoteClient {
    async fn exists_for_issue(&self, issue_id: i64) -> Result<bool> {
        let url = format!("{}/api/votes/exists?issueId={}", self.base_url, issue_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::VoteApi(format!("Existence check failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::VoteApi(format!(
                "Existence check returned HTTP {}",
                status
            )));
        }

        let body: ExistsResponse = response
            .json()
            .await
            .map_err(|e| Error::VoteApi(format!("Malformed existence response: {}", e)))?;

        Ok(body.exists)
    }

    async fn create(&self, request: &VoteCreateRequest) -> Result<()> {
        let url = format!("{}/api/votes/ai-create", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::VoteApi(format!("Create request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VoteApi(format!(
                "Create returned HTTP {}: {}",
                status, body
            )));
        }

        let body = response.text().await.unwrap_or_default();
        debug!(issue_id = request.issue_id, response = %body, "Vote creation submitted");

        Ok(())
    }
}
