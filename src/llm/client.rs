use crate::types::Result;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// The research pipeline is written against this trait, allowing providers
/// to be swapped (or mocked in tests) without changing pipeline code.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}
