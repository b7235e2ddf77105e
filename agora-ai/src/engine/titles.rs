//! Title enrichment
//!
//! Sequential batch over all non-deleted articles, one full
//! generate-validate-persist cycle per item. Every attempt (success or
//! failure) increments the record's try count; skips leave the record
//! untouched, which is what makes re-running the batch idempotent.

use chrono::Utc;
use tracing::{error, info, warn};

use super::{Engine, MAX_TITLE_CHARS, MAX_TRY, TITLE_MAX_TOKENS, TITLE_TEMPERATURE};
use crate::db::{sources, title_records};
use crate::error::Result;
use crate::generation::prompts;
use crate::models::{Article, TitleBatchReport, TitleOutcome, TitleRecord, TitleStatus};

impl Engine {
    /// Run the full title-enrichment batch and return the aggregated report
    pub async fn run_title_batch(&self) -> Result<TitleBatchReport> {
        let articles = sources::list_active_articles(&self.db).await?;
        let mut report = TitleBatchReport::default();

        for article in &articles {
            let outcome = self.process_title(article).await;

            if let TitleOutcome::Failed(error) = &outcome {
                warn!(article_id = article.article_id, error = %error, "Title generation failed");
            }

            report.record(article.article_id, &outcome);
        }

        info!(
            success = report.success_count,
            failed = report.failed_count,
            skipped = report.skipped_count,
            "Title batch finished"
        );
        for (reason, count) in report.reason_counts() {
            error!(reason = %reason, count, "Title failure reason");
        }

        Ok(report)
    }

    /// Process one article's title enrichment
    ///
    /// Never returns an error: every failure is folded into the outcome so
    /// the batch keeps going.
    pub async fn process_title(&self, article: &Article) -> TitleOutcome {
        let existing = match title_records::get_title_record(&self.db, article.article_id).await {
            Ok(record) => record,
            Err(e) => return TitleOutcome::Failed(format!("PROCESS ERROR: {}", e)),
        };

        // Skip order matters: the attempt ceiling is checked before the
        // already-successful check
        if let Some(record) = &existing {
            if record.try_count >= MAX_TRY {
                return TitleOutcome::SkippedMaxTry;
            }
            if record.has_successful_title() {
                return TitleOutcome::AlreadyExists;
            }
        }

        let mut record = existing.unwrap_or_else(|| TitleRecord::new(article.article_id));

        let body = prompts::body_or_title(&article.title, article.content.as_deref());
        let prompt = prompts::title_prompt(&article.title, body);

        let now = Utc::now();
        let attempt_error = match self
            .generator
            .generate(&prompt, TITLE_MAX_TOKENS, TITLE_TEMPERATURE)
            .await
        {
            Ok(title) if title.chars().count() <= MAX_TITLE_CHARS => {
                record.status = TitleStatus::Success;
                record.ai_title = Some(title);
                record.last_error = None;
                record.last_success_at = Some(now);
                None
            }
            Ok(title) => {
                // Too-long titles are a failed attempt, never truncated
                let reason = format!(
                    "AI title length exceeded: {} chars (max {})",
                    title.chars().count(),
                    MAX_TITLE_CHARS
                );
                record.status = TitleStatus::Failed;
                record.ai_title = None;
                record.last_error = Some(reason.clone());
                record.last_success_at = None;
                Some(reason)
            }
            Err(e) => {
                let reason = e.to_string();
                record.status = TitleStatus::Failed;
                record.ai_title = None;
                record.last_error = Some(reason.clone());
                record.last_success_at = None;
                Some(reason)
            }
        };

        record.try_count += 1;
        record.model_name = Some(self.generator.model_name().to_string());
        record.updated_at = now;

        if let Err(db_err) = title_records::upsert_title_record(&self.db, &record).await {
            let db_error_msg = match &attempt_error {
                Some(gen_err) => format!("{} | DB ERROR: {}", gen_err, db_err),
                None => format!("DB ERROR: {}", db_err),
            };
            warn!(
                article_id = article.article_id,
                error = %db_error_msg,
                "Title record commit failed"
            );

            // Second write records the commit failure itself; the record
            // stays non-SUCCESS so the next run picks the article up again
            record.status = TitleStatus::DbCommitFailed;
            record.last_error = Some(db_error_msg.clone());
            record.updated_at = Utc::now();

            if let Err(second_err) = title_records::upsert_title_record(&self.db, &record).await {
                error!(
                    article_id = article.article_id,
                    error = %second_err,
                    "Title record abandoned for this run"
                );
            }

            return TitleOutcome::Failed(db_error_msg);
        }

        match attempt_error {
            None => TitleOutcome::Success,
            Some(reason) => TitleOutcome::Failed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::engine::testutil::{MockGenerator, MockVoteApi};
    use crate::generation::GenerationError;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    async fn insert_article(pool: &SqlitePool, article_id: i64, title: &str) {
        sqlx::query("INSERT INTO rss_articles (article_id, title) VALUES (?, ?)")
            .bind(article_id)
            .bind(title)
            .execute(pool)
            .await
            .unwrap();
    }

    fn engine_with(pool: SqlitePool, generator: Arc<MockGenerator>) -> Engine {
        Engine::new(pool, generator, Arc::new(MockVoteApi::default()))
    }

    fn article(article_id: i64, title: &str) -> Article {
        Article {
            article_id,
            title: title.to_string(),
            content: None,
            thumbnail_url: None,
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_success_creates_record() {
        let pool = test_pool().await;
        insert_article(&pool, 42, "A").await;
        let generator = Arc::new(MockGenerator::always("Breaking: A Happens"));
        let engine = engine_with(pool.clone(), generator.clone());

        let outcome = engine.process_title(&article(42, "A")).await;
        assert_eq!(outcome, TitleOutcome::Success);

        let record = title_records::get_title_record(&pool, 42)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, TitleStatus::Success);
        assert_eq!(record.try_count, 1);
        assert_eq!(record.ai_title.as_deref(), Some("Breaking: A Happens"));
        assert_eq!(record.model_name.as_deref(), Some("mock-model"));
        assert!(record.last_success_at.is_some());
    }

    #[tokio::test]
    async fn test_length_violation_is_failed_attempt() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        let too_long = "x".repeat(51);
        let generator = Arc::new(MockGenerator::always(&too_long));
        let engine = engine_with(pool.clone(), generator);

        let outcome = engine.process_title(&article(1, "A")).await;
        match outcome {
            TitleOutcome::Failed(reason) => assert!(reason.contains("length")),
            other => panic!("expected Failed, got {:?}", other),
        }

        let record = title_records::get_title_record(&pool, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, TitleStatus::Failed);
        assert_eq!(record.try_count, 1);
        assert!(record.ai_title.is_none());
        assert!(record.last_error.as_deref().unwrap().contains("length"));
    }

    #[tokio::test]
    async fn test_exactly_fifty_chars_is_accepted() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        let at_limit = "y".repeat(50);
        let engine = engine_with(pool.clone(), Arc::new(MockGenerator::always(&at_limit)));

        assert_eq!(engine.process_title(&article(1, "A")).await, TitleOutcome::Success);
    }

    #[tokio::test]
    async fn test_success_record_skipped_untouched() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        let generator = Arc::new(MockGenerator::always("좋은 제목"));
        let engine = engine_with(pool.clone(), generator.clone());

        assert_eq!(engine.process_title(&article(1, "A")).await, TitleOutcome::Success);
        let first = title_records::get_title_record(&pool, 1).await.unwrap().unwrap();

        assert_eq!(
            engine.process_title(&article(1, "A")).await,
            TitleOutcome::AlreadyExists
        );
        let second = title_records::get_title_record(&pool, 1).await.unwrap().unwrap();

        assert_eq!(second.try_count, first.try_count);
        assert_eq!(second.ai_title, first.ai_title);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_max_try_ceiling_skips_without_generation() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;

        let mut record = TitleRecord::new(1);
        record.try_count = MAX_TRY;
        record.status = TitleStatus::Failed;
        record.last_error = Some("old failure".to_string());
        title_records::upsert_title_record(&pool, &record).await.unwrap();

        let generator = Arc::new(MockGenerator::always("unused"));
        let engine = engine_with(pool.clone(), generator.clone());

        assert_eq!(
            engine.process_title(&article(1, "A")).await,
            TitleOutcome::SkippedMaxTry
        );
        assert_eq!(generator.call_count(), 0);

        let loaded = title_records::get_title_record(&pool, 1).await.unwrap().unwrap();
        assert_eq!(loaded.try_count, MAX_TRY);
    }

    #[tokio::test]
    async fn test_failed_attempts_accumulate_try_count() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        let generator = Arc::new(MockGenerator::with_responses(vec![
            Err(GenerationError::Network("connect refused".to_string())),
            Err(GenerationError::Api("HTTP 500".to_string())),
        ]));
        let engine = engine_with(pool.clone(), generator);

        assert!(matches!(
            engine.process_title(&article(1, "A")).await,
            TitleOutcome::Failed(_)
        ));
        assert!(matches!(
            engine.process_title(&article(1, "A")).await,
            TitleOutcome::Failed(_)
        ));

        let record = title_records::get_title_record(&pool, 1).await.unwrap().unwrap();
        assert_eq!(record.try_count, 2);
        assert_eq!(record.status, TitleStatus::Failed);
        assert!(record.last_error.as_deref().unwrap().contains("HTTP 500"));
    }

    // Fails inserts carrying the given status, leaving other writes alone
    async fn install_commit_fault(pool: &SqlitePool, status: &str) {
        sqlx::query(&format!(
            "CREATE TRIGGER fail_commit BEFORE INSERT ON title_records
             WHEN NEW.status = '{}'
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
            status
        ))
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_commit_failure_records_db_commit_failed() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        install_commit_fault(&pool, TitleStatus::Success.as_str()).await;

        let engine = engine_with(pool.clone(), Arc::new(MockGenerator::always("좋은 제목")));

        let outcome = engine.process_title(&article(1, "A")).await;
        match outcome {
            TitleOutcome::Failed(reason) => assert!(reason.contains("DB ERROR:")),
            other => panic!("expected Failed, got {:?}", other),
        }

        // The second write landed with the commit failure recorded
        let record = title_records::get_title_record(&pool, 1).await.unwrap().unwrap();
        assert_eq!(record.status, TitleStatus::DbCommitFailed);
        assert_eq!(record.try_count, 1);
        assert_eq!(record.ai_title.as_deref(), Some("좋은 제목"));
        assert!(record.last_error.as_deref().unwrap().contains("DB ERROR:"));
    }

    #[tokio::test]
    async fn test_commit_failure_concatenates_generation_error() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        install_commit_fault(&pool, TitleStatus::Failed.as_str()).await;

        let generator = Arc::new(MockGenerator::with_responses(vec![Err(
            GenerationError::Api("HTTP 500".to_string()),
        )]));
        let engine = engine_with(pool.clone(), generator);

        let outcome = engine.process_title(&article(1, "A")).await;
        match outcome {
            TitleOutcome::Failed(reason) => {
                assert!(reason.contains("HTTP 500"));
                assert!(reason.contains(" | DB ERROR:"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }

        let record = title_records::get_title_record(&pool, 1).await.unwrap().unwrap();
        assert_eq!(record.status, TitleStatus::DbCommitFailed);
        assert!(record.last_error.as_deref().unwrap().contains(" | DB ERROR:"));
    }

    #[tokio::test]
    async fn test_double_commit_failure_abandons_record_for_run() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "A").await;
        // Every insert fails, including the DB_COMMIT_FAILED write
        sqlx::query(
            "CREATE TRIGGER fail_all BEFORE INSERT ON title_records
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let engine = engine_with(pool.clone(), Arc::new(MockGenerator::always("좋은 제목")));

        assert!(matches!(
            engine.process_title(&article(1, "A")).await,
            TitleOutcome::Failed(_)
        ));
        // No record persisted, so the next run retries from scratch
        assert!(title_records::get_title_record(&pool, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_end_to_end() {
        let pool = test_pool().await;
        insert_article(&pool, 42, "A").await;
        let engine = engine_with(pool.clone(), Arc::new(MockGenerator::always("Breaking: A Happens")));

        let report = engine.run_title_batch().await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.skipped_count, 0);

        // Second run skips, nothing changes
        let report = engine.run_title_batch().await.unwrap();
        assert_eq!(report.success_count, 0);
        assert_eq!(report.skipped_count, 1);
    }

    #[tokio::test]
    async fn test_batch_ignores_deleted_articles() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO rss_articles (article_id, title, is_deleted) VALUES (1, 'gone', 1)")
            .execute(&pool)
            .await
            .unwrap();
        let generator = Arc::new(MockGenerator::always("unused"));
        let engine = engine_with(pool.clone(), generator.clone());

        let report = engine.run_title_batch().await.unwrap();
        assert_eq!(report.success_count + report.failed_count + report.skipped_count, 0);
        assert_eq!(generator.call_count(), 0);
    }
}
