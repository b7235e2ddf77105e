//! Queue dispatchers
//!
//! Two long-running loops pop trigger tags and hand them to the engine. A
//! processed tag sets an idempotency marker; a tag whose marker is already set
//! is dropped before any engine work, so redelivery never duplicates output.
//! The loops never exit: a handler error is logged and followed by a short
//! delay, an empty queue by a poll interval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::models::{IssueOutcome, SourceKind, VoteOutcome};
use crate::queue::{WorkQueue, ISSUE_TRIGGER_QUEUE, VOTE_TRIGGER_QUEUE};

/// Sleep between polls of an empty queue
pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Sleep after a handler error, before the next pop
pub const ERROR_DELAY: Duration = Duration::from_secs(1);

/// Marker value for a processed tag
const MARKER_DONE: &str = "1";

/// A parsed trigger tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `article:<id>`: derive an issue from an RSS article
    Article(i64),
    /// `cp:<id>`: derive an issue from a community post
    CommunityPost(i64),
    /// `issueApprove:<id>`: an approved issue, propose its vote
    IssueApprove(i64),
    /// `issue:<id>`: propose a vote for an issue
    Issue(i64),
}

impl Tag {
    /// Parse a raw queue tag, `None` when the prefix or id is malformed
    pub fn parse(raw: &str) -> Option<Tag> {
        let (prefix, id) = raw.split_once(':')?;
        let id: i64 = id.parse().ok()?;
        match prefix {
            "article" => Some(Tag::Article(id)),
            "cp" => Some(Tag::CommunityPost(id)),
            "issueApprove" => Some(Tag::IssueApprove(id)),
            "issue" => Some(Tag::Issue(id)),
            _ => None,
        }
    }

    /// Idempotency marker key for this tag
    pub fn marker_key(&self) -> String {
        match self {
            Tag::Article(id) => format!("article:{}:triggered", id),
            Tag::CommunityPost(id) => format!("cp:{}:triggered", id),
            // Both vote triggers share one marker per issue
            Tag::IssueApprove(id) | Tag::Issue(id) => format!("issue:{}:voteCreated", id),
        }
    }
}

/// What one dispatch iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStep {
    /// Queue was empty
    Idle,
    /// A tag was popped and handled (processed, skipped, or dropped)
    Handled,
    /// The handler failed; the loop should back off
    Errored,
}

/// Issue dispatcher: drains ISSUE_TRIGGER_QUEUE forever
pub async fn run_issue_worker(engine: Arc<Engine>, queue: Arc<dyn WorkQueue>) {
    loop {
        match issue_dispatch_step(&engine, queue.as_ref()).await {
            DispatchStep::Idle => tokio::time::sleep(POLL_INTERVAL).await,
            DispatchStep::Handled => {}
            DispatchStep::Errored => tokio::time::sleep(ERROR_DELAY).await,
        }
    }
}

/// Vote dispatcher: drains VOTE_TRIGGER_QUEUE forever
pub async fn run_vote_worker(engine: Arc<Engine>, queue: Arc<dyn WorkQueue>) {
    loop {
        match vote_dispatch_step(&engine, queue.as_ref()).await {
            DispatchStep::Idle => tokio::time::sleep(POLL_INTERVAL).await,
            DispatchStep::Handled => {}
            DispatchStep::Errored => tokio::time::sleep(ERROR_DELAY).await,
        }
    }
}

/// Run one iteration of the issue dispatcher
pub async fn issue_dispatch_step(engine: &Engine, queue: &dyn WorkQueue) -> DispatchStep {
    let raw = match queue.pop(ISSUE_TRIGGER_QUEUE).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return DispatchStep::Idle,
        Err(e) => {
            error!(queue = ISSUE_TRIGGER_QUEUE, error = %e, "Queue pop failed");
            return DispatchStep::Errored;
        }
    };

    match dispatch_issue_tag(engine, queue, &raw).await {
        Ok(()) => DispatchStep::Handled,
        Err(e) => {
            error!(tag = %raw, error = %e, "Issue dispatch failed");
            DispatchStep::Errored
        }
    }
}

/// Run one iteration of the vote dispatcher
pub async fn vote_dispatch_step(engine: &Engine, queue: &dyn WorkQueue) -> DispatchStep {
    let raw = match queue.pop(VOTE_TRIGGER_QUEUE).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return DispatchStep::Idle,
        Err(e) => {
            error!(queue = VOTE_TRIGGER_QUEUE, error = %e, "Queue pop failed");
            return DispatchStep::Errored;
        }
    };

    match dispatch_vote_tag(engine, queue, &raw).await {
        Ok(()) => DispatchStep::Handled,
        Err(e) => {
            error!(tag = %raw, error = %e, "Vote dispatch failed");
            DispatchStep::Errored
        }
    }
}

async fn dispatch_issue_tag(engine: &Engine, queue: &dyn WorkQueue, raw: &str) -> Result<()> {
    let Some(tag) = Tag::parse(raw) else {
        warn!(tag = %raw, "Dropping malformed issue trigger");
        return Ok(());
    };

    if marker_already_set(queue, &tag).await? {
        return Ok(());
    }

    match tag {
        Tag::Article(id) => {
            let outcome = engine.process_issue(SourceKind::Rss, id).await?;
            finish_issue_tag(queue, &tag, outcome).await
        }
        Tag::CommunityPost(id) => {
            let outcome = engine.process_issue(SourceKind::Community, id).await?;
            finish_issue_tag(queue, &tag, outcome).await
        }
        // Approval triggers flow through the issue queue but do vote work
        Tag::IssueApprove(id) => {
            let outcome = engine.propose_vote(id).await?;
            finish_vote_tag(queue, &tag, outcome).await
        }
        Tag::Issue(_) => {
            warn!(tag = %raw, "Dropping vote trigger from the issue queue");
            Ok(())
        }
    }
}

async fn dispatch_vote_tag(engine: &Engine, queue: &dyn WorkQueue, raw: &str) -> Result<()> {
    let Some(Tag::Issue(id)) = Tag::parse(raw) else {
        warn!(tag = %raw, "Dropping malformed vote trigger");
        return Ok(());
    };
    let tag = Tag::Issue(id);

    if marker_already_set(queue, &tag).await? {
        return Ok(());
    }

    let outcome = engine.propose_vote(id).await?;
    finish_vote_tag(queue, &tag, outcome).await
}

async fn marker_already_set(queue: &dyn WorkQueue, tag: &Tag) -> Result<bool> {
    let marker = queue.get_flag(&tag.marker_key()).await?;
    Ok(marker.as_deref() == Some(MARKER_DONE))
}

async fn finish_issue_tag(queue: &dyn WorkQueue, tag: &Tag, outcome: IssueOutcome) -> Result<()> {
    match outcome {
        IssueOutcome::Created(_) | IssueOutcome::Existing(_) => {
            queue.set_flag(&tag.marker_key(), MARKER_DONE).await
        }
        // A missing source may appear later; leave the marker unset
        IssueOutcome::NotFound => Ok(()),
    }
}

async fn finish_vote_tag(queue: &dyn WorkQueue, tag: &Tag, outcome: VoteOutcome) -> Result<()> {
    match outcome {
        VoteOutcome::Submitted | VoteOutcome::IgnoredVoteExists => {
            queue.set_flag(&tag.marker_key(), MARKER_DONE).await
        }
        VoteOutcome::NotFound => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::engine::testutil::{MockGenerator, MockVoteApi};
    use crate::queue::SqliteWorkQueue;
    use sqlx::SqlitePool;

    #[test]
    fn test_tag_parsing() {
        assert_eq!(Tag::parse("article:42"), Some(Tag::Article(42)));
        assert_eq!(Tag::parse("cp:7"), Some(Tag::CommunityPost(7)));
        assert_eq!(Tag::parse("issueApprove:3"), Some(Tag::IssueApprove(3)));
        assert_eq!(Tag::parse("issue:9"), Some(Tag::Issue(9)));

        assert_eq!(Tag::parse("article:"), None);
        assert_eq!(Tag::parse("article:abc"), None);
        assert_eq!(Tag::parse("unknown:1"), None);
        assert_eq!(Tag::parse("noseparator"), None);
    }

    #[test]
    fn test_marker_keys() {
        assert_eq!(Tag::Article(42).marker_key(), "article:42:triggered");
        assert_eq!(Tag::CommunityPost(7).marker_key(), "cp:7:triggered");
        assert_eq!(Tag::IssueApprove(3).marker_key(), "issue:3:voteCreated");
        assert_eq!(Tag::Issue(3).marker_key(), "issue:3:voteCreated");
    }

    async fn insert_article(pool: &SqlitePool, article_id: i64, title: &str) {
        sqlx::query("INSERT INTO rss_articles (article_id, title, content) VALUES (?, ?, '본문')")
            .bind(article_id)
            .bind(title)
            .execute(pool)
            .await
            .unwrap();
    }

    const CARD_JSON: &str = r#"{
        "issue_title": "쟁점",
        "issue_summary": "요약.",
        "key_points": ["하나"],
        "importance": "중간",
        "vote_type": "YESNO"
    }"#;

    fn setup(pool: SqlitePool, generator: MockGenerator) -> (Engine, SqliteWorkQueue, Arc<MockVoteApi>) {
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool.clone(), Arc::new(generator), votes.clone());
        (engine, SqliteWorkQueue::new(pool), votes)
    }

    #[tokio::test]
    async fn test_article_trigger_creates_issue_and_marker() {
        let pool = test_pool().await;
        insert_article(&pool, 42, "기사").await;
        let (engine, queue, _) = setup(pool.clone(), MockGenerator::always(CARD_JSON));

        queue.push(ISSUE_TRIGGER_QUEUE, "article:42").await.unwrap();

        assert_eq!(issue_dispatch_step(&engine, &queue).await, DispatchStep::Handled);
        assert_eq!(
            queue.get_flag("article:42:triggered").await.unwrap().as_deref(),
            Some("1")
        );
        assert!(crate::db::issues::find_issue_by_source(&pool, SourceKind::Rss, 42)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_marker_skips_before_engine_work() {
        let pool = test_pool().await;
        insert_article(&pool, 1, "기사").await;
        let generator = MockGenerator::always(CARD_JSON);
        let (engine, queue, _) = setup(pool.clone(), generator);

        queue.set_flag("article:1:triggered", "1").await.unwrap();
        queue.push(ISSUE_TRIGGER_QUEUE, "article:1").await.unwrap();

        assert_eq!(issue_dispatch_step(&engine, &queue).await, DispatchStep::Handled);
        assert!(crate::db::issues::find_issue_by_source(&pool, SourceKind::Rss, 1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_malformed_tag_dropped() {
        let pool = test_pool().await;
        let (engine, queue, _) = setup(pool, MockGenerator::always(CARD_JSON));

        queue.push(ISSUE_TRIGGER_QUEUE, "garbage").await.unwrap();

        assert_eq!(issue_dispatch_step(&engine, &queue).await, DispatchStep::Handled);
        assert_eq!(queue.pop(ISSUE_TRIGGER_QUEUE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_source_leaves_marker_unset() {
        let pool = test_pool().await;
        let (engine, queue, _) = setup(pool, MockGenerator::always(CARD_JSON));

        queue.push(ISSUE_TRIGGER_QUEUE, "article:404").await.unwrap();

        assert_eq!(issue_dispatch_step(&engine, &queue).await, DispatchStep::Handled);
        assert_eq!(queue.get_flag("article:404:triggered").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let pool = test_pool().await;
        let (engine, queue, _) = setup(pool, MockGenerator::always(CARD_JSON));

        assert_eq!(issue_dispatch_step(&engine, &queue).await, DispatchStep::Idle);
        assert_eq!(vote_dispatch_step(&engine, &queue).await, DispatchStep::Idle);
    }

    async fn seed_issue(pool: &SqlitePool) -> i64 {
        use crate::db::issues::{insert_issue, NewIssue};
        use crate::generation::schema::{Importance, VoteTypeHint};
        use crate::models::IssueInsight;

        insert_issue(
            pool,
            &NewIssue {
                source: SourceKind::Rss,
                article_id: Some(1),
                community_post_id: None,
                title: "쟁점".to_string(),
                content: None,
                thumbnail: None,
                ai_summary: "요약.".to_string(),
                insight: IssueInsight {
                    key_points: Vec::new(),
                    importance: Importance::Medium,
                    vote_type: VoteTypeHint::YesNo,
                },
                model_name: "test-model".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_vote_trigger_submits_once() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool).await;
        let (engine, queue, votes) = setup(
            pool,
            MockGenerator::always(r#"{"question":"q","options":["찬성"],"result_type":"YES_NO"}"#),
        );

        let tag = format!("issue:{}", issue_id);
        queue.push(VOTE_TRIGGER_QUEUE, &tag).await.unwrap();
        queue.push(VOTE_TRIGGER_QUEUE, &tag).await.unwrap();

        assert_eq!(vote_dispatch_step(&engine, &queue).await, DispatchStep::Handled);
        assert_eq!(vote_dispatch_step(&engine, &queue).await, DispatchStep::Handled);

        // Redelivered tag hit the marker, only one request went out
        assert_eq!(votes.created.lock().unwrap().len(), 1);
        assert_eq!(
            queue
                .get_flag(&format!("issue:{}:voteCreated", issue_id))
                .await
                .unwrap()
                .as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_approval_trigger_on_issue_queue_proposes_vote() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool).await;
        let (engine, queue, votes) = setup(
            pool,
            MockGenerator::always(r#"{"question":"q","options":["찬성"],"result_type":"YES_NO"}"#),
        );

        queue
            .push(ISSUE_TRIGGER_QUEUE, &format!("issueApprove:{}", issue_id))
            .await
            .unwrap();

        assert_eq!(issue_dispatch_step(&engine, &queue).await, DispatchStep::Handled);
        assert_eq!(votes.created.lock().unwrap().len(), 1);
        assert_eq!(
            queue
                .get_flag(&format!("issue:{}:voteCreated", issue_id))
                .await
                .unwrap()
                .as_deref(),
            Some("1")
        );
    }
}
