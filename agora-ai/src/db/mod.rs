//! Database access for agora-ai
//!
//! Shared SQLite database holding source items, enrichment records, issues,
//! the durable work queue and the settings table.

pub mod issues;
pub mod settings;
pub mod sources;
pub mod title_records;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create agora-ai tables if they don't exist
///
/// Source tables are owned by the upstream content system; they are created
/// here too so a standalone deployment (and the test suite) can run against an
/// empty database.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rss_articles (
            article_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT,
            thumbnail_url TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            issue_created INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS community_posts (
            post_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS title_records (
            article_id INTEGER PRIMARY KEY REFERENCES rss_articles(article_id),
            try_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            ai_title TEXT,
            model_name TEXT,
            last_error TEXT,
            last_success_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            issue_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            article_id INTEGER,
            community_post_id INTEGER,
            title TEXT NOT NULL,
            content TEXT,
            thumbnail TEXT,
            ai_summary TEXT NOT NULL DEFAULT '',
            ai_points TEXT NOT NULL DEFAULT '[]',
            importance TEXT NOT NULL DEFAULT '중간',
            vote_type TEXT NOT NULL DEFAULT 'YESNO',
            status TEXT NOT NULL DEFAULT 'PENDING',
            created_by TEXT NOT NULL DEFAULT 'AI',
            model_name TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One issue per source item, enforced at the store level so a concurrent
    // duplicate insert fails instead of racing past the lookup
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_issues_article
         ON issues(article_id) WHERE article_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_issues_community_post
         ON issues(community_post_id) WHERE community_post_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            queue TEXT NOT NULL,
            tag TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_work_queue_queue ON work_queue(queue, id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_flags (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    init_tables(&pool).await.unwrap();
    pool
}
