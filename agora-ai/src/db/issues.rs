//! Issue persistence
//!
//! The one-issue-per-source invariant is backed by partial unique indexes on
//! `article_id` and `community_post_id` (see `db::init_tables`), so the
//! check-then-create in the engine fails safely under a concurrent duplicate.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::generation::schema::{Importance, VoteTypeHint};
use crate::models::{Issue, IssueInsight, IssueStatus, SourceKind};

/// Fields of a new issue, before it has an id
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub source: SourceKind,
    pub article_id: Option<i64>,
    pub community_post_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub ai_summary: String,
    pub insight: IssueInsight,
    pub model_name: String,
}

fn issue_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Issue> {
    let source: String = row.get("source");
    let source = match source.as_str() {
        "COMMUNITY" => SourceKind::Community,
        _ => SourceKind::Rss,
    };

    let status: String = row.get("status");
    let importance: String = row.get("importance");
    let vote_type: String = row.get("vote_type");

    let ai_points: String = row.get("ai_points");
    let key_points: Vec<String> = serde_json::from_str(&ai_points)
        .map_err(|e| Error::Internal(format!("Failed to deserialize ai_points: {}", e)))?;

    let parse_ts = |field: &str| -> Result<DateTime<Utc>> {
        let raw: String = row.get(field);
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
    };

    Ok(Issue {
        issue_id: row.get("issue_id"),
        source,
        article_id: row.get("article_id"),
        community_post_id: row.get("community_post_id"),
        title: row.get("title"),
        content: row.get("content"),
        thumbnail: row.get("thumbnail"),
        ai_summary: row.get("ai_summary"),
        insight: IssueInsight {
            key_points,
            importance: Importance::coerce(&importance),
            vote_type: VoteTypeHint::coerce(&vote_type),
        },
        status: IssueStatus::parse(&status),
        created_by: row.get("created_by"),
        model_name: row.get("model_name"),
        created_at: parse_ts("created_at")?,
        updated_at: parse_ts("updated_at")?,
    })
}

const ISSUE_COLUMNS: &str = "issue_id, source, article_id, community_post_id, title, content,
         thumbnail, ai_summary, ai_points, importance, vote_type, status,
         created_by, model_name, created_at, updated_at";

/// Fetch one issue by id
pub async fn get_issue(pool: &SqlitePool, issue_id: i64) -> Result<Option<Issue>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM issues WHERE issue_id = ?",
        ISSUE_COLUMNS
    ))
    .bind(issue_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(issue_from_row).transpose()
}

/// Find the issue derived from a given source item, if any
pub async fn find_issue_by_source(
    pool: &SqlitePool,
    kind: SourceKind,
    source_id: i64,
) -> Result<Option<Issue>> {
    let column = match kind {
        SourceKind::Rss => "article_id",
        SourceKind::Community => "community_post_id",
    };

    let row = sqlx::query(&format!(
        "SELECT {} FROM issues WHERE {} = ?",
        ISSUE_COLUMNS, column
    ))
    .bind(source_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(issue_from_row).transpose()
}

/// Insert a new PENDING issue and return its id
pub async fn insert_issue(pool: &SqlitePool, new_issue: &NewIssue) -> Result<i64> {
    let ai_points = serde_json::to_string(&new_issue.insight.key_points)
        .map_err(|e| Error::Internal(format!("Failed to serialize key points: {}", e)))?;
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO issues (
            source, article_id, community_post_id, title, content, thumbnail,
            ai_summary, ai_points, importance, vote_type, status, created_by,
            model_name, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', 'AI', ?, ?, ?)
        "#,
    )
    .bind(new_issue.source.as_str())
    .bind(new_issue.article_id)
    .bind(new_issue.community_post_id)
    .bind(&new_issue.title)
    .bind(&new_issue.content)
    .bind(&new_issue.thumbnail)
    .bind(&new_issue.ai_summary)
    .bind(&ai_points)
    .bind(new_issue.insight.importance.as_str())
    .bind(new_issue.insight.vote_type.as_str())
    .bind(&new_issue.model_name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
