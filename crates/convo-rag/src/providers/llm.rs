//! LLM provider trait for chat completion

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatMessage;

/// Trait for chat completion
///
/// Implementations:
/// - `GeminiClient`: Gemini API (gemini-2.0-flash)
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, etc.)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response to an ordered list of role-tagged messages
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
