//! One conversation: rewrite → retrieve → compose per question

use std::time::Instant;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::{AnswerComposer, QueryRewriter};
use crate::providers::ProviderSet;
use crate::retrieval::{ContextRetriever, RetrievedContext};
use crate::types::{ConversationHistory, Query};

/// Result of a successfully answered question
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Original and rewritten question
    pub query: Query,
    /// Retrieval result the answer was grounded on
    pub context: RetrievedContext,
    /// Model answer
    pub answer: String,
}

impl TurnOutcome {
    /// Whether the answer had any document context to work from
    pub fn found_context(&self) -> bool {
        self.context.found()
    }
}

/// A conversation with its own history.
///
/// Each instance owns an independent `ConversationHistory`; nothing is
/// shared between sessions.
pub struct ChatSession {
    id: Uuid,
    rewriter: QueryRewriter,
    retriever: ContextRetriever,
    composer: AnswerComposer,
    history: ConversationHistory,
}

impl ChatSession {
    pub fn new(rewriter: QueryRewriter, retriever: ContextRetriever, composer: AnswerComposer) -> Self {
        Self {
            id: Uuid::new_v4(),
            rewriter,
            retriever,
            composer,
            history: ConversationHistory::new(),
        }
    }

    /// Wire a session over the given providers
    pub fn from_providers(providers: &ProviderSet, config: &RagConfig) -> Self {
        Self::new(
            QueryRewriter::new(providers.llm.clone()),
            ContextRetriever::new(
                providers.embedder.clone(),
                providers.vector_store.clone(),
                config.retrieval.top_k,
            ),
            AnswerComposer::new(providers.llm.clone(), config.session.persona.clone()),
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    /// Answer one question.
    ///
    /// Blank questions are rejected with `Error::EmptyInput` before any
    /// service is called. Retrieval and generation failures propagate and
    /// leave the history unchanged.
    pub async fn ask(&mut self, question: &str) -> Result<TurnOutcome> {
        let query = Query::new(question)?;
        let started = Instant::now();

        let rewritten = self
            .rewriter
            .rewrite(&query.original_question, &self.history)
            .await;
        let query = query.with_rewrite(rewritten);
        tracing::info!(
            rewritten = %query.rewritten_question,
            changed = query.was_rewritten(),
            "Query rewritten"
        );

        let context = self.retriever.retrieve(&query.rewritten_question).await?;
        if !context.found() {
            tracing::info!(matches = context.chunks.len(), "No usable context found");
        }

        let answer = self
            .composer
            .answer(&query, context.context_text.as_deref(), &mut self.history)
            .await?;

        tracing::info!(
            chunks = context.usable_chunks(),
            history_turns = self.history.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Turn completed"
        );

        Ok(TurnOutcome {
            query,
            context,
            answer,
        })
    }
}
