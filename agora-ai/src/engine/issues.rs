//! Issue derivation
//!
//! One issue card per source item, created at most once. Unparseable model
//! text degrades to a fallback card built from the source title; a generation
//! error propagates instead, leaving no row behind so the trigger stays
//! retriable. An issue, once created, is never regenerated.

use tracing::{info, warn};

use super::linker::ensure_once;
use super::{Engine, CARD_MAX_TOKENS, CARD_TEMPERATURE};
use crate::db::{issues, sources};
use crate::error::Result;
use crate::generation::prompts;
use crate::generation::schema::{self, IssueCard};
use crate::models::{IssueInsight, IssueOutcome, SourceItem, SourceKind};

impl Engine {
    /// Derive an issue from a source item, creating it at most once
    pub async fn process_issue(&self, kind: SourceKind, source_id: i64) -> Result<IssueOutcome> {
        let item: Option<SourceItem> = match kind {
            SourceKind::Rss => sources::get_article(&self.db, source_id)
                .await?
                .map(Into::into),
            SourceKind::Community => sources::get_community_post(&self.db, source_id)
                .await?
                .map(Into::into),
        };

        let Some(item) = item else {
            warn!(kind = kind.as_str(), source_id, "Source item not found");
            return Ok(IssueOutcome::NotFound);
        };

        let (issue_id, created) = ensure_once(
            || async {
                Ok(issues::find_issue_by_source(&self.db, kind, source_id)
                    .await?
                    .map(|issue| issue.issue_id))
            },
            || self.create_issue(&item),
        )
        .await?;

        if created {
            if kind == SourceKind::Rss {
                sources::mark_issue_created(&self.db, source_id).await?;
            }
            info!(kind = kind.as_str(), source_id, issue_id, "Issue created");
            Ok(IssueOutcome::Created(issue_id))
        } else {
            info!(
                kind = kind.as_str(),
                source_id, issue_id, "Issue already exists"
            );
            Ok(IssueOutcome::Existing(issue_id))
        }
    }

    async fn create_issue(&self, item: &SourceItem) -> Result<i64> {
        let body = prompts::body_or_title(&item.title, item.content.as_deref());
        let prompt = prompts::issue_card_prompt(&item.title, body);

        // A generation error propagates; the fallback card is reserved for
        // text the model did produce but that does not parse
        let raw = self
            .generator
            .generate(&prompt, CARD_MAX_TOKENS, CARD_TEMPERATURE)
            .await?;
        let card = schema::parse_issue_card(&raw, &item.title);

        self.insert_card(item, card).await
    }

    async fn insert_card(&self, item: &SourceItem, card: IssueCard) -> Result<i64> {
        let new_issue = issues::NewIssue {
            source: item.kind,
            article_id: (item.kind == SourceKind::Rss).then_some(item.id),
            community_post_id: (item.kind == SourceKind::Community).then_some(item.id),
            title: card.issue_title,
            content: item.content.clone(),
            thumbnail: item.thumbnail_url.clone(),
            ai_summary: card.issue_summary,
            insight: IssueInsight {
                key_points: card.key_points,
                importance: card.importance,
                vote_type: card.vote_type,
            },
            model_name: self.generator.model_name().to_string(),
        };

        issues::insert_issue(&self.db, &new_issue).await
    }
}
