//! Grounded answer generation

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::{ChatMessage, ConversationHistory, Query};

use super::prompt::PromptBuilder;

/// Builds the grounded prompt, calls the model and records the exchange
pub struct AnswerComposer {
    llm: Arc<dyn LlmProvider>,
    persona: String,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LlmProvider>, persona: impl Into<String>) -> Self {
        Self {
            llm,
            persona: persona.into(),
        }
    }

    /// Answer `query` from `context` and the conversation so far.
    ///
    /// On success the original question and the answer are appended to
    /// `history`; on failure `history` is left untouched.
    pub async fn answer(
        &self,
        query: &Query,
        context: Option<&str>,
        history: &mut ConversationHistory,
    ) -> Result<String> {
        let prompt = PromptBuilder::build_answer_prompt(&self.persona, query, context, history);
        tracing::debug!(
            prompt_chars = prompt.len(),
            has_context = context.is_some(),
            "Requesting answer"
        );

        let answer = self.llm.complete(&[ChatMessage::user(prompt)]).await?;

        history.record_exchange(query.original_question.clone(), answer.clone());
        Ok(answer)
    }
}
