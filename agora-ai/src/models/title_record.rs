//! Title enrichment record
//!
//! One row per article, unique on the article id. The record carries the
//! durable attempt history that makes title generation retries converge:
//! `try_count` only ever grows, and a SUCCESS record is never regenerated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title enrichment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TitleStatus {
    /// Created but no attempt recorded yet
    Pending,
    /// Generation succeeded; `ai_title` is set and within the length bound
    Success,
    /// Last attempt failed (generation error or length violation)
    Failed,
    /// Generated outcome could not be committed; retried next run
    DbCommitFailed,
}

impl TitleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleStatus::Pending => "PENDING",
            TitleStatus::Success => "SUCCESS",
            TitleStatus::Failed => "FAILED",
            TitleStatus::DbCommitFailed => "DB_COMMIT_FAILED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "SUCCESS" => TitleStatus::Success,
            "FAILED" => TitleStatus::Failed,
            "DB_COMMIT_FAILED" => TitleStatus::DbCommitFailed,
            _ => TitleStatus::Pending,
        }
    }
}

/// Per-article title enrichment record
#[derive(Debug, Clone)]
pub struct TitleRecord {
    pub article_id: i64,
    pub try_count: i64,
    pub status: TitleStatus,
    pub ai_title: Option<String>,
    pub model_name: Option<String>,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TitleRecord {
    /// Fresh record for an article with no prior attempts
    pub fn new(article_id: i64) -> Self {
        let now = Utc::now();
        Self {
            article_id,
            try_count: 0,
            status: TitleStatus::Pending,
            ai_title: None,
            model_name: None,
            last_error: None,
            last_success_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record already holds a usable generated title
    pub fn has_successful_title(&self) -> bool {
        self.status == TitleStatus::Success
            && self.ai_title.as_deref().is_some_and(|t| !t.is_empty())
    }
}
