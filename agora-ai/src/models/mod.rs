//! Domain models for agora-ai

pub mod issue;
pub mod outcome;
pub mod source;
pub mod title_record;

pub use issue::{Issue, IssueInsight, IssueStatus};
pub use outcome::{FailedTitle, IssueOutcome, TitleBatchReport, TitleOutcome, VoteOutcome};
pub use source::{Article, CommunityPost, SourceItem, SourceKind};
pub use title_record::{TitleRecord, TitleStatus};
