//! Source item queries
//!
//! Articles and community posts are owned by the upstream content system;
//! the only write here is the `issue_created` flag flip after issue creation.

use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::{Article, CommunityPost};

fn article_from_row(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        article_id: row.get("article_id"),
        title: row.get("title"),
        content: row.get("content"),
        thumbnail_url: row.get("thumbnail_url"),
        is_deleted: row.get::<i64, _>("is_deleted") != 0,
    }
}

/// List all non-deleted articles, in id order
pub async fn list_active_articles(pool: &SqlitePool) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        "SELECT article_id, title, content, thumbnail_url, is_deleted
         FROM rss_articles
         WHERE is_deleted = 0
         ORDER BY article_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(article_from_row).collect())
}

/// Fetch one article by id
pub async fn get_article(pool: &SqlitePool, article_id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(
        "SELECT article_id, title, content, thumbnail_url, is_deleted
         FROM rss_articles
         WHERE article_id = ?",
    )
    .bind(article_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(article_from_row))
}

/// Fetch one community post by id
pub async fn get_community_post(pool: &SqlitePool, post_id: i64) -> Result<Option<CommunityPost>> {
    let row = sqlx::query(
        "SELECT post_id, title, content
         FROM community_posts
         WHERE post_id = ?",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| CommunityPost {
        post_id: row.get("post_id"),
        title: row.get("title"),
        content: row.get("content"),
    }))
}

/// Mark an article as having a derived issue
pub async fn mark_issue_created(pool: &SqlitePool, article_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE rss_articles
         SET issue_created = 1, updated_at = ?
         WHERE article_id = ?",
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(article_id)
    .execute(pool)
    .await?;

    Ok(())
}
