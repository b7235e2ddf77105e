//! Text generation: the external LLM capability and its typed output schemas
//!
//! The engine never talks to a model vendor directly; it goes through the
//! object-safe [`TextGenerator`] trait so tests can script responses.

pub mod openai;
pub mod prompts;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiGenerator;

/// Errors from the generation capability
///
/// Malformed JSON in the model's output is deliberately not represented here:
/// the typed parsers in [`schema`] degrade to deterministic fallbacks instead
/// of surfacing a parse failure.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network-level failure (connect, timeout)
    #[error("Generation request failed: {0}")]
    Network(String),

    /// The API returned a non-success status
    #[error("Generation API error: {0}")]
    Api(String),

    /// The API answered but produced no usable text
    #[error("Generation returned empty output")]
    Empty,
}

/// External text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one prompt to completion and return the raw model text
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GenerationError>;

    /// Identifier of the model producing output, recorded on enrichment rows
    fn model_name(&self) -> &str;
}
