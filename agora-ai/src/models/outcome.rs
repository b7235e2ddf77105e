//! Per-item and batch outcome types
//!
//! One outcome shape is used uniformly across the batch API and the queue
//! dispatchers: counts plus an article-indexed list of per-item errors.

use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one title enrichment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    /// Generated, validated and committed
    Success,
    /// Attempt recorded as FAILED (generation error, length violation, or
    /// a commit failure recorded as DB_COMMIT_FAILED)
    Failed(String),
    /// Record already at the attempt ceiling; untouched
    SkippedMaxTry,
    /// Record already holds a successful title; untouched
    AlreadyExists,
}

/// One failed article in a batch report
#[derive(Debug, Clone, Serialize)]
pub struct FailedTitle {
    pub article_id: i64,
    pub error: String,
}

/// Aggregated result of a title enrichment batch run
#[derive(Debug, Default, Serialize)]
pub struct TitleBatchReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub failed_articles: Vec<FailedTitle>,
}

impl TitleBatchReport {
    /// Record a single per-item outcome into the aggregate
    pub fn record(&mut self, article_id: i64, outcome: &TitleOutcome) {
        match outcome {
            TitleOutcome::Success => self.success_count += 1,
            TitleOutcome::Failed(error) => {
                self.failed_count += 1;
                self.failed_articles.push(FailedTitle {
                    article_id,
                    error: error.clone(),
                });
            }
            TitleOutcome::SkippedMaxTry | TitleOutcome::AlreadyExists => {
                self.skipped_count += 1
            }
        }
    }

    /// Frequency table of distinct failure reasons, for logging
    pub fn reason_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for failed in &self.failed_articles {
            *counts.entry(failed.error.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Outcome of a single issue enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// New issue created for the source item
    Created(i64),
    /// Issue already existed; reused without regeneration
    Existing(i64),
    /// Source item does not exist
    NotFound,
}

impl IssueOutcome {
    pub fn issue_id(&self) -> Option<i64> {
        match self {
            IssueOutcome::Created(id) | IssueOutcome::Existing(id) => Some(*id),
            IssueOutcome::NotFound => None,
        }
    }
}

/// Outcome of a vote proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Exactly one creation request was sent to the vote system
    Submitted,
    /// A vote already exists for this issue; nothing sent
    IgnoredVoteExists,
    /// Issue does not exist
    NotFound,
}
