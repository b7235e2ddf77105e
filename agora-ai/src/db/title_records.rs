//! Title enrichment record store
//!
//! One row per article; writes go through an atomic upsert so retries from
//! any run converge on a single record.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::models::{TitleRecord, TitleStatus};

fn parse_timestamp(value: Option<String>, field: &str) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
        })
        .transpose()
}

/// Load the title record for an article, if any
pub async fn get_title_record(pool: &SqlitePool, article_id: i64) -> Result<Option<TitleRecord>> {
    let row = sqlx::query(
        "SELECT article_id, try_count, status, ai_title, model_name,
                last_error, last_success_at, created_at, updated_at
         FROM title_records
         WHERE article_id = ?",
    )
    .bind(article_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let status: String = row.get("status");
            let created_at = parse_timestamp(Some(row.get("created_at")), "created_at")?
                .unwrap_or_else(Utc::now);
            let updated_at = parse_timestamp(Some(row.get("updated_at")), "updated_at")?
                .unwrap_or_else(Utc::now);

            Ok(Some(TitleRecord {
                article_id: row.get("article_id"),
                try_count: row.get("try_count"),
                status: TitleStatus::parse(&status),
                ai_title: row.get("ai_title"),
                model_name: row.get("model_name"),
                last_error: row.get("last_error"),
                last_success_at: parse_timestamp(row.get("last_success_at"), "last_success_at")?,
                created_at,
                updated_at,
            }))
        }
        None => Ok(None),
    }
}

/// Create-or-update the title record for an article
pub async fn upsert_title_record(pool: &SqlitePool, record: &TitleRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO title_records (
            article_id, try_count, status, ai_title, model_name,
            last_error, last_success_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(article_id) DO UPDATE SET
            try_count = excluded.try_count,
            status = excluded.status,
            ai_title = excluded.ai_title,
            model_name = excluded.model_name,
            last_error = excluded.last_error,
            last_success_at = excluded.last_success_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(record.article_id)
    .bind(record.try_count)
    .bind(record.status.as_str())
    .bind(&record.ai_title)
    .bind(&record.model_name)
    .bind(&record.last_error)
    .bind(record.last_success_at.map(|dt| dt.to_rfc3339()))
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}
