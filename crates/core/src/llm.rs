//! Llm trait: the abstraction over language-model backends.
//!
//! Agents that consult a remote model talk to it through this trait, and
//! prompt selectors inspect its identity to pick a prompt variant.
//!
//! Implementations: OpenAI-compatible endpoints, scripted test doubles.

use async_trait::async_trait;

use crate::error::ProviderError;

#[async_trait]
pub trait Llm: Send + Sync {
    /// The backend name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// The model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Whether the backend speaks a chat protocol rather than raw completion.
    fn is_chat(&self) -> bool {
        false
    }

    /// Complete `prompt`, cutting the generation at the first stop sequence.
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ProviderError>;
}
