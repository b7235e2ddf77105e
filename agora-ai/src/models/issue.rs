//! Issue: a derived, human-reviewable debate card
//!
//! Created at most once per source item. Approval status is flipped by an
//! external review step; agora-ai only ever creates PENDING issues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::schema::{Importance, VoteTypeHint};
use crate::models::SourceKind;

/// Issue approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueStatus {
    Pending,
    Approved,
    Rejected,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "PENDING",
            IssueStatus::Approved => "APPROVED",
            IssueStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "APPROVED" => IssueStatus::Approved,
            "REJECTED" => IssueStatus::Rejected,
            _ => IssueStatus::Pending,
        }
    }
}

/// Structured AI insight attached to an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueInsight {
    pub key_points: Vec<String>,
    pub importance: Importance,
    pub vote_type: VoteTypeHint,
}

/// Issue row
#[derive(Debug, Clone)]
pub struct Issue {
    pub issue_id: i64,
    pub source: SourceKind,
    pub article_id: Option<i64>,
    pub community_post_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub ai_summary: String,
    pub insight: IssueInsight,
    pub status: IssueStatus,
    pub created_by: String,
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// The source item id this issue was derived from
    pub fn source_id(&self) -> Option<i64> {
        match self.source {
            SourceKind::Rss => self.article_id,
            SourceKind::Community => self.community_post_id,
        }
    }
}
