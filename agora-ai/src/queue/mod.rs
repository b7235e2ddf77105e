//! Durable work queue and idempotency flags
//!
//! The dispatchers only depend on the [`WorkQueue`] contract: FIFO string
//! tags per named queue, plus a key-value flag store for idempotency markers.
//! The production implementation keeps both in the service's SQLite database;
//! the contract matches what a Redis list + SETs would provide, so the
//! transport can be swapped without touching the dispatchers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// Queue carrying issue-creation triggers (`article:<id>`, `cp:<id>`,
/// `issueApprove:<id>`)
pub const ISSUE_TRIGGER_QUEUE: &str = "ISSUE_TRIGGER_QUEUE";

/// Queue carrying vote-creation triggers (`issue:<id>`)
pub const VOTE_TRIGGER_QUEUE: &str = "VOTE_TRIGGER_QUEUE";

/// Durable FIFO queue + idempotency flag store
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Append a tag to the named queue
    async fn push(&self, queue: &str, tag: &str) -> Result<()>;

    /// Pop the oldest tag from the named queue, if any (non-blocking)
    async fn pop(&self, queue: &str) -> Result<Option<String>>;

    /// Set an idempotency marker
    async fn set_flag(&self, key: &str, value: &str) -> Result<()>;

    /// Read an idempotency marker
    async fn get_flag(&self, key: &str) -> Result<Option<String>>;
}

/// SQLite-backed work queue
#[derive(Clone)]
pub struct SqliteWorkQueue {
    pool: SqlitePool,
}

impl SqliteWorkQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete idempotency markers older than the given cutoff
    ///
    /// Markers have no expiry in the queue contract; deployments run this
    /// periodically to bound growth of the flag table.
    pub async fn purge_flags_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM queue_flags WHERE created_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl WorkQueue for SqliteWorkQueue {
    async fn push(&self, queue: &str, tag: &str) -> Result<()> {
        sqlx::query("INSERT INTO work_queue (queue, tag, created_at) VALUES (?, ?, ?)")
            .bind(queue)
            .bind(tag)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>> {
        // Select-then-delete inside one transaction keeps pop atomic against
        // another consumer on the same queue
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, tag FROM work_queue WHERE queue = ? ORDER BY id LIMIT 1",
        )
        .bind(queue)
        .fetch_optional(&mut *tx)
        .await?;

        let popped = match row {
            Some(row) => {
                let id: i64 = row.get("id");
                let tag: String = row.get("tag");
                sqlx::query("DELETE FROM work_queue WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                Some(tag)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(popped)
    }

    async fn set_flag(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO queue_flags (key, value, created_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_flag(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM queue_flags WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }
}
