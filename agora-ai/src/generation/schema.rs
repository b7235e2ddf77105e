//! Typed parse-and-coerce layer for model output
//!
//! One parser per JSON output schema (issue card, vote proposal, vote rule),
//! each with its own deterministic fallback. A parse failure never escapes
//! this module: the pipeline degrades to a usable default object instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of vote options kept after coercion
pub const MAX_VOTE_OPTIONS: usize = 5;

/// Option titles substituted when the model supplies none
pub const FALLBACK_OPTIONS: [&str; 2] = ["찬성", "반대"];

/// Literal tokens stripped from option text when the result type has no draw
const DRAW_TOKENS: [&str; 2] = ["DRAW", "무승부"];

/// Issue importance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    #[serde(rename = "낮음")]
    Low,
    #[serde(rename = "중간")]
    Medium,
    #[serde(rename = "높음")]
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "낮음",
            Importance::Medium => "중간",
            Importance::High => "높음",
        }
    }

    /// Coerce arbitrary model text to an allowed level, defaulting to medium
    pub fn coerce(s: &str) -> Self {
        match s.trim() {
            "낮음" => Importance::Low,
            "높음" => Importance::High,
            "중간" => Importance::Medium,
            _ => Importance::Medium,
        }
    }
}

/// Recommended vote mechanism for an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteTypeHint {
    #[serde(rename = "YESNO")]
    YesNo,
    #[serde(rename = "MULTI")]
    Multi,
}

impl VoteTypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteTypeHint::YesNo => "YESNO",
            VoteTypeHint::Multi => "MULTI",
        }
    }

    pub fn coerce(s: &str) -> Self {
        match s.trim() {
            "MULTI" => VoteTypeHint::Multi,
            _ => VoteTypeHint::YesNo,
        }
    }
}

/// How a vote resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    #[serde(rename = "YES_NO")]
    YesNo,
    #[serde(rename = "YES_NO_DRAW")]
    YesNoDraw,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::YesNo => "YES_NO",
            ResultType::YesNoDraw => "YES_NO_DRAW",
        }
    }

    pub fn coerce(s: &str) -> Self {
        match s.trim() {
            "YES_NO_DRAW" => ResultType::YesNoDraw,
            _ => ResultType::YesNo,
        }
    }
}

/// Coerced issue card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCard {
    pub issue_title: String,
    pub issue_summary: String,
    pub key_points: Vec<String>,
    pub importance: Importance,
    pub vote_type: VoteTypeHint,
}

/// Coerced vote proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteProposal {
    pub question: String,
    pub options: Vec<String>,
    pub result_type: ResultType,
}

/// Coerced vote rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRule {
    pub rule_type: String,
    pub rule_description: String,
}

/// Extract a string field, empty when absent or non-string
fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Coerce a field to a list of strings
///
/// Accepts a JSON array of strings, or a string holding nested JSON (models
/// sometimes double-encode the list); anything else becomes the empty list.
fn string_list_field(value: &Value, key: &str) -> Vec<String> {
    fn from_array(items: &[Value]) -> Vec<String> {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    match value.get(key) {
        Some(Value::Array(items)) => from_array(items),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => from_array(&items),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Parse and coerce a raw issue-card response
///
/// On JSON decode failure, falls back to a card titled with the source title,
/// empty key points, medium importance and a YESNO vote hint.
pub fn parse_issue_card(raw: &str, source_title: &str) -> IssueCard {
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(v) => v,
        Err(_) => {
            return IssueCard {
                issue_title: source_title.to_string(),
                issue_summary: String::new(),
                key_points: Vec::new(),
                importance: Importance::Medium,
                vote_type: VoteTypeHint::YesNo,
            }
        }
    };

    let issue_title = match string_field(&value, "issue_title") {
        t if t.is_empty() => source_title.to_string(),
        t => t,
    };

    IssueCard {
        issue_title,
        issue_summary: string_field(&value, "issue_summary"),
        key_points: string_list_field(&value, "key_points"),
        importance: Importance::coerce(&string_field(&value, "importance")),
        vote_type: VoteTypeHint::coerce(&string_field(&value, "vote_type")),
    }
}

/// Strip literal draw tokens out of option text
fn strip_draw_tokens(option: &str) -> String {
    let mut cleaned = option.to_string();
    for token in DRAW_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.trim().to_string()
}

/// Normalize option titles: drop empties, clip to the maximum, substitute the
/// fallback pair below the minimum, and strip draw tokens for YES_NO votes
fn coerce_options(raw_options: Vec<String>, result_type: ResultType) -> Vec<String> {
    let mut options: Vec<String> = raw_options
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .take(MAX_VOTE_OPTIONS)
        .collect();

    if options.is_empty() {
        options = FALLBACK_OPTIONS.iter().map(|s| s.to_string()).collect();
    }

    if result_type == ResultType::YesNo {
        options = options
            .into_iter()
            .map(|o| strip_draw_tokens(&o))
            .filter(|o| !o.is_empty())
            .collect();
        // Everything may have been a draw token; re-apply the minimum
        if options.is_empty() {
            options = FALLBACK_OPTIONS.iter().map(|s| s.to_string()).collect();
        }
    }

    options
}

/// Parse and coerce a raw vote-proposal response
pub fn parse_vote_proposal(raw: &str) -> VoteProposal {
    let value: Value = serde_json::from_str(raw.trim()).unwrap_or(Value::Null);

    let result_type = ResultType::coerce(&string_field(&value, "result_type"));
    let options = coerce_options(string_list_field(&value, "options"), result_type);

    VoteProposal {
        question: string_field(&value, "question"),
        options,
        result_type,
    }
}

/// Parse and coerce a raw vote-rule response
pub fn parse_vote_rule(raw: &str) -> VoteRule {
    let value: Value = serde_json::from_str(raw.trim()).unwrap_or(Value::Null);

    VoteRule {
        rule_type: string_field(&value, "rule_type"),
        rule_description: string_field(&value, "rule_description"),
    }
}
