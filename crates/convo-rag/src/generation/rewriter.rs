//! Conversational query rewriting

use std::sync::Arc;

use crate::providers::LlmProvider;
use crate::types::{ChatMessage, ConversationHistory};

use super::prompt::PromptBuilder;

/// Turns a context-dependent follow-up into a standalone question.
///
/// Never fails: any model error, or a blank reply, falls back to the
/// original question.
pub struct QueryRewriter {
    llm: Arc<dyn LlmProvider>,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Rewrite `question` using the conversation so far.
    ///
    /// `question` must already be non-blank.
    pub async fn rewrite(&self, question: &str, history: &ConversationHistory) -> String {
        let prompt = PromptBuilder::build_rewrite_prompt(question, history);

        match self.llm.complete(&[ChatMessage::user(prompt)]).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => rewritten.trim().to_string(),
            Ok(_) => {
                tracing::warn!("Query rewriting returned no text, using the original question");
                question.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query rewriting failed, using the original question");
                question.to_string()
            }
        }
    }
}
