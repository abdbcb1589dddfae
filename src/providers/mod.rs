mod open_ai;
mod prompt;

pub use open_ai::OpenAIProvider;
pub use prompt::{
    build_system_prompt, PROMPT_VERSION, RECIPE_EXTRACTION_PROMPT, SCHEMA_ORG_EXTRACTION_PROMPT,
};

use crate::error::ExtractError;
use async_trait::async_trait;

/// A chat-completion endpoint that answers with a JSON object
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai")
    fn provider_name(&self) -> &str;

    /// Send one system turn and one user turn, returning the raw JSON reply
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, ExtractError>;
}
