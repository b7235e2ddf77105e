//! Enrichment engine
//!
//! Decides per item whether to (re)generate, applies the result, updates the
//! durable record, and classifies the outcome. Three entry points: the title
//! batch (`run_title_batch` / `process_title`), single-item issue creation
//! (`process_issue`), and vote proposal (`propose_vote`).

pub mod issues;
pub mod linker;
pub mod titles;
pub mod votes;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::generation::TextGenerator;
use crate::services::VoteApi;

/// Maximum generation attempts per article title
pub const MAX_TRY: i64 = 3;

/// Maximum accepted length of a generated title, in characters
pub const MAX_TITLE_CHARS: usize = 50;

/// Token and temperature budgets per generation kind
pub(crate) const TITLE_MAX_TOKENS: u32 = 60;
pub(crate) const TITLE_TEMPERATURE: f32 = 1.5;
pub(crate) const CARD_MAX_TOKENS: u32 = 300;
pub(crate) const CARD_TEMPERATURE: f32 = 0.7;

/// Fixed vote horizon and fee applied to every proposal
pub const VOTE_HORIZON_DAYS: i64 = 7;
pub const VOTE_FEE_RATE: f64 = 0.10;
pub(crate) const VOTE_INITIAL_STATUS: &str = "REVIEWING";

/// The enrichment engine
///
/// Owns no state beyond its collaborators; each operation runs its own
/// load-generate-persist cycle against the shared store.
pub struct Engine {
    pub(crate) db: SqlitePool,
    pub(crate) generator: Arc<dyn TextGenerator>,
    pub(crate) votes: Arc<dyn VoteApi>,
}

impl Engine {
    pub fn new(
        db: SqlitePool,
        generator: Arc<dyn TextGenerator>,
        votes: Arc<dyn VoteApi>,
    ) -> Self {
        Self {
            db,
            generator,
            votes,
        }
    }
}
