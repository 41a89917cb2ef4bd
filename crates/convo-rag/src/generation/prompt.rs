//! Prompt templates for query rewriting and grounded answering

use crate::types::{ConversationHistory, Query};

/// Stand-in for the chat history when the conversation has just started
pub const NO_HISTORY_PLACEHOLDER: &str = "No previous conversation history.";

/// Sentence the model is told to give when the context lacks the answer
pub const NOT_FOUND_ANSWER: &str = "I could not find the answer in the provided documents";

/// Prompt builder for the conversational pipeline
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the prompt asking the model to turn a follow-up into a standalone question
    pub fn build_rewrite_prompt(question: &str, history: &ConversationHistory) -> String {
        let history_text = if history.is_empty() {
            NO_HISTORY_PLACEHOLDER.to_string()
        } else {
            history.render()
        };

        format!(
            r#"You are a query rewriting expert. Based on the provided chat history, rephrase the "Follow Up user Question" into a complete, standalone question that can be understood without the chat history.
Only output the rewritten question and nothing else.

Chat History:
{history}

Follow Up user Question: {question}"#,
            history = history_text,
            question = question,
        )
    }

    /// Build the grounded answer prompt.
    ///
    /// `context` is `None` when retrieval found nothing usable; the context
    /// section is then left out. The history section is left out while the
    /// history is empty.
    pub fn build_answer_prompt(
        persona: &str,
        query: &Query,
        context: Option<&str>,
        history: &ConversationHistory,
    ) -> String {
        let mut prompt = format!(
            r#"You have to behave like {persona}.
You will be given a context of relevant information and a user question.
Your task is to answer the user's question based only on the provided context.
If the answer is not in the context, you must say "{not_found}".
Keep your answer clear, concise and educational."#,
            persona = persona,
            not_found = NOT_FOUND_ANSWER,
        );

        if let Some(context) = context {
            prompt.push_str("\n\nContext: ");
            prompt.push_str(context);
        }

        if !history.is_empty() {
            prompt.push_str("\n\nChat History:\n");
            prompt.push_str(&history.render());
        }

        prompt.push_str(&format!(
            "\n\nOriginal Question: {}\nTransformed Question: {}",
            query.original_question, query.rewritten_question
        ));

        prompt
    }
}
