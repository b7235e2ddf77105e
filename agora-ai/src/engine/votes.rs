//! Vote proposal
//!
//! At most one creation request per issue is ever sent to the vote system.
//! The existence check goes to the vote system itself; no local vote state is
//! kept. Submission is fire-and-forget: the vote system owns the vote from
//! the moment the request lands.

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use super::linker::ensure_once;
use super::{Engine, CARD_MAX_TOKENS, CARD_TEMPERATURE, VOTE_FEE_RATE, VOTE_HORIZON_DAYS, VOTE_INITIAL_STATUS};
use crate::db::issues;
use crate::error::Result;
use crate::generation::prompts;
use crate::generation::schema::{self, ResultType, VoteProposal, VoteRule};
use crate::models::{Issue, VoteOutcome};
use crate::services::{VoteCreateRequest, VoteOptionRequest, VoteRuleRequest};

impl Engine {
    /// Propose a vote for an issue, submitting at most one creation request
    pub async fn propose_vote(&self, issue_id: i64) -> Result<VoteOutcome> {
        let Some(issue) = issues::get_issue(&self.db, issue_id).await? else {
            warn!(issue_id, "Issue not found for vote proposal");
            return Ok(VoteOutcome::NotFound);
        };

        let (_, submitted) = ensure_once(
            || async {
                Ok(self
                    .votes
                    .exists_for_issue(issue_id)
                    .await?
                    .then_some(()))
            },
            || self.submit_vote(&issue),
        )
        .await?;

        if submitted {
            info!(issue_id, "Vote proposal submitted");
            Ok(VoteOutcome::Submitted)
        } else {
            info!(issue_id, "Vote already exists, proposal ignored");
            Ok(VoteOutcome::IgnoredVoteExists)
        }
    }

    async fn submit_vote(&self, issue: &Issue) -> Result<()> {
        let proposal = self.generate_proposal(issue).await?;
        let rule = self.generate_rule(issue).await?;

        // The generated question is advisory; the submitted question is the
        // issue's own summary so reviewers see consistent text
        if !proposal.question.is_empty() {
            debug!(
                issue_id = issue.issue_id,
                question = %proposal.question,
                "Generated vote question"
            );
        }
        let question = if issue.ai_summary.trim().is_empty() {
            issue.title.clone()
        } else {
            issue.ai_summary.clone()
        };

        let options = proposal
            .options
            .iter()
            .map(|title| VoteOptionRequest {
                title: title.clone(),
                choices: option_choices(proposal.result_type),
            })
            .collect();

        let request = VoteCreateRequest {
            issue_id: issue.issue_id,
            question,
            options,
            result_type: proposal.result_type.as_str().to_string(),
            end_at: Utc::now() + Duration::days(VOTE_HORIZON_DAYS),
            rule: VoteRuleRequest {
                rule_type: rule.rule_type,
                description: rule.rule_description,
            },
            initial_status: VOTE_INITIAL_STATUS.to_string(),
            fee_rate: VOTE_FEE_RATE,
        };

        self.votes.create(&request).await
    }

    // Generation errors propagate so nothing is submitted and the trigger
    // stays retriable; the coercion fallbacks apply only to text the model
    // actually produced
    async fn generate_proposal(&self, issue: &Issue) -> Result<VoteProposal> {
        let prompt = prompts::vote_proposal_prompt(&issue.title, &issue.ai_summary);
        let raw = self
            .generator
            .generate(&prompt, CARD_MAX_TOKENS, CARD_TEMPERATURE)
            .await?;
        Ok(schema::parse_vote_proposal(&raw))
    }

    async fn generate_rule(&self, issue: &Issue) -> Result<VoteRule> {
        let prompt = prompts::vote_rule_prompt(&issue.title, &issue.ai_summary);
        let raw = self
            .generator
            .generate(&prompt, CARD_MAX_TOKENS, CARD_TEMPERATURE)
            .await?;
        Ok(schema::parse_vote_rule(&raw))
    }
}

/// Resolvable choices attached to every option of a proposal
fn option_choices(result_type: ResultType) -> Vec<String> {
    let mut choices = vec!["YES".to_string(), "NO".to_string()];
    if result_type == ResultType::YesNoDraw {
        choices.push("DRAW".to_string());
    }
    choices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::issues::{insert_issue, NewIssue};
    use crate::db::test_pool;
    use crate::engine::testutil::{MockGenerator, MockVoteApi};
    use crate::generation::schema::{Importance, VoteTypeHint};
    use crate::models::{IssueInsight, SourceKind};
    use sqlx::SqlitePool;
    use std::sync::Arc;

    async fn seed_issue(pool: &SqlitePool, summary: &str) -> i64 {
        insert_issue(
            pool,
            &NewIssue {
                source: SourceKind::Rss,
                article_id: Some(1),
                community_post_id: None,
                title: "쟁점".to_string(),
                content: None,
                thumbnail: None,
                ai_summary: summary.to_string(),
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

    const PROPOSAL_JSON: &str = r#"{
        "question": "승리할 것인가?",
        "options": ["팀 A 승리", "팀 B 승리"],
        "result_type": "YES_NO_DRAW"
    }"#;

    const RULE_JSON: &str =
        r#"{"rule_type": "공식 발표", "rule_description": "경기 결과 발표 기준 판정."}"#;

    #[tokio::test]
    async fn test_submits_one_request_with_fanout() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool, "요약 문장.").await;
        let generator = Arc::new(MockGenerator::with_responses(vec![
            Ok(PROPOSAL_JSON.to_string()),
            Ok(RULE_JSON.to_string()),
        ]));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool, generator, votes.clone());

        let outcome = engine.propose_vote(issue_id).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Submitted);

        let created = votes.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let request = &created[0];
        assert_eq!(request.issue_id, issue_id);
        assert_eq!(request.question, "요약 문장.");
        assert_eq!(request.result_type, "YES_NO_DRAW");
        assert_eq!(request.options.len(), 2);
        assert_eq!(request.options[0].title, "팀 A 승리");
        assert_eq!(request.options[0].choices, vec!["YES", "NO", "DRAW"]);
        assert_eq!(request.rule.rule_type, "공식 발표");
        assert_eq!(request.initial_status, "REVIEWING");
        assert!((request.fee_rate - 0.10).abs() < f64::EPSILON);
        assert!(request.end_at > Utc::now() + Duration::days(6));
    }

    #[tokio::test]
    async fn test_yes_no_options_have_no_draw_choice() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool, "요약.").await;
        let generator = Arc::new(MockGenerator::with_responses(vec![
            Ok(r#"{"question":"q","options":["찬성"],"result_type":"YES_NO"}"#.to_string()),
            Ok(RULE_JSON.to_string()),
        ]));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool, generator, votes.clone());

        engine.propose_vote(issue_id).await.unwrap();

        let created = votes.created.lock().unwrap();
        assert_eq!(created[0].options[0].choices, vec!["YES", "NO"]);
    }

    #[tokio::test]
    async fn test_second_proposal_ignored() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool, "요약.").await;
        let generator = Arc::new(MockGenerator::with_responses(vec![
            Ok(PROPOSAL_JSON.to_string()),
            Ok(RULE_JSON.to_string()),
        ]));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool, generator.clone(), votes.clone());

        assert_eq!(engine.propose_vote(issue_id).await.unwrap(), VoteOutcome::Submitted);
        assert_eq!(
            engine.propose_vote(issue_id).await.unwrap(),
            VoteOutcome::IgnoredVoteExists
        );

        assert_eq!(votes.created.lock().unwrap().len(), 1);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_summary_falls_back_to_title() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool, "").await;
        let generator = Arc::new(MockGenerator::with_responses(vec![
            Ok(PROPOSAL_JSON.to_string()),
            Ok(RULE_JSON.to_string()),
        ]));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool, generator, votes.clone());

        engine.propose_vote(issue_id).await.unwrap();
        assert_eq!(votes.created.lock().unwrap()[0].question, "쟁점");
    }

    #[tokio::test]
    async fn test_generation_error_submits_nothing_and_stays_retriable() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool, "요약.").await;
        // Every generation call errors out
        let generator = Arc::new(MockGenerator::with_responses(Vec::new()));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool.clone(), generator, votes.clone());

        assert!(engine.propose_vote(issue_id).await.is_err());
        assert!(votes.created.lock().unwrap().is_empty());

        // Once generation recovers, the real proposal goes out
        let generator = Arc::new(MockGenerator::with_responses(vec![
            Ok(PROPOSAL_JSON.to_string()),
            Ok(RULE_JSON.to_string()),
        ]));
        let engine = Engine::new(pool, generator, votes.clone());

        assert_eq!(engine.propose_vote(issue_id).await.unwrap(), VoteOutcome::Submitted);
        let created = votes.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].rule.rule_type, "공식 발표");
    }

    #[tokio::test]
    async fn test_malformed_proposal_text_coerced_to_fallback_options() {
        let pool = test_pool().await;
        let issue_id = seed_issue(&pool, "요약.").await;
        // The model answered, but with unparseable text
        let generator = Arc::new(MockGenerator::always("not json"));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool, generator, votes.clone());

        assert_eq!(engine.propose_vote(issue_id).await.unwrap(), VoteOutcome::Submitted);

        let created = votes.created.lock().unwrap();
        assert_eq!(created[0].result_type, "YES_NO");
        assert_eq!(created[0].options.len(), 2);
        assert_eq!(created[0].options[0].title, "찬성");
    }

    #[tokio::test]
    async fn test_missing_issue_is_not_found() {
        let pool = test_pool().await;
        let generator = Arc::new(MockGenerator::with_responses(Vec::new()));
        let votes = Arc::new(MockVoteApi::default());
        let engine = Engine::new(pool, generator.clone(), votes.clone());

        assert_eq!(engine.propose_vote(99).await.unwrap(), VoteOutcome::NotFound);
        assert_eq!(generator.call_count(), 0);
        assert!(votes.created.lock().unwrap().is_empty());
    }
}
