//! End-to-end session tests with scripted providers

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use convo_rag::session::{ChatSession, ExitStatus, LineSource, SessionLoop, SessionState};
use convo_rag::types::{ChatMessage, IndexRecord, RetrievedChunk, Role};
use convo_rag::{
    AnswerComposer, ContextRetriever, EmbeddingProvider, Error, IndexStats, LlmProvider,
    QueryRewriter, Result, ServiceFailure, VectorStoreProvider,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Chat model that replays scripted replies and records every prompt
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        assert_eq!(messages.len(), 1, "pipeline sends exactly one message");
        assert_eq!(messages[0].role, Role::User);
        self.prompts.lock().unwrap().push(messages[0].content.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::generation("no scripted reply")))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Embedder that records the texts it embeds
#[derive(Default)]
struct RecordingEmbedder {
    texts: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingEmbedder {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::embedding(
                ServiceFailure::new("API key not valid")
                    .with_status(400)
                    .with_payload(r#"{"error":{"code":400,"message":"API key not valid"}}"#),
            ));
        }
        Ok(vec![0.25; 4])
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Index that replays scripted search results
#[derive(Default)]
struct ScriptedIndex {
    results: Mutex<VecDeque<Result<Vec<RetrievedChunk>>>>,
    searches: Mutex<usize>,
}

impl ScriptedIndex {
    fn new(results: Vec<Result<Vec<RetrievedChunk>>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            searches: Mutex::new(0),
        })
    }

    fn searches(&self) -> usize {
        *self.searches.lock().unwrap()
    }
}

#[async_trait]
impl VectorStoreProvider for ScriptedIndex {
    async fn search(&self, _query_embedding: &[f32], _top_k: usize) -> Result<Vec<RetrievedChunk>> {
        *self.searches.lock().unwrap() += 1;
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        Ok(records.len())
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            dimension: Some(4),
            total_vectors: 3,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted-index"
    }
}

/// Scripted terminal input
struct ScriptedInput(VecDeque<Result<Option<String>>>);

impl ScriptedInput {
    fn lines(lines: &[&str]) -> Self {
        Self(lines.iter().map(|l| Ok(Some(l.to_string()))).collect())
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        self.0.pop_front().unwrap_or(Ok(None))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn chunk(id: &str, text: Option<&str>, score: f32) -> RetrievedChunk {
    RetrievedChunk::new(id, text.map(str::to_string), score)
}

fn stack_chunks() -> Vec<RetrievedChunk> {
    vec![
        chunk("s1", Some("A stack is a linear data structure."), 0.93),
        chunk("s2", Some("Stacks follow Last In First Out order."), 0.90),
        chunk("s3", Some("Push and pop operate on the top."), 0.87),
    ]
}

fn session(
    llm: &Arc<ScriptedLlm>,
    embedder: &Arc<RecordingEmbedder>,
    index: &Arc<ScriptedIndex>,
) -> ChatSession {
    let llm: Arc<dyn LlmProvider> = llm.clone();
    ChatSession::new(
        QueryRewriter::new(llm.clone()),
        ContextRetriever::new(embedder.clone(), index.clone(), 10),
        AnswerComposer::new(llm, "a data structure and algorithms expert"),
    )
}

fn output_text(repl: &SessionLoop<ScriptedInput, Vec<u8>>) -> String {
    String::from_utf8(repl.output().clone()).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_two_turn_conversation_uses_history() {
    let llm = ScriptedLlm::new(vec![
        Ok("What is a stack?".to_string()),
        Ok("A stack is a LIFO data structure.".to_string()),
        Ok("What are the use cases of a stack?".to_string()),
        Ok("Stacks back function calls and undo history.".to_string()),
    ]);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![Ok(stack_chunks()), Ok(stack_chunks())]);

    let input = ScriptedInput::lines(&["What is a stack?", "What about its use cases?", "exit"]);
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    let outcome = repl.run().await.unwrap();

    assert_eq!(outcome.status, ExitStatus::Normal);
    assert_eq!(outcome.turns_completed, 2);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 4);

    // First rewrite sees no history
    assert!(prompts[0].contains("No previous conversation history."));

    // First answer prompt carries the joined chunks and both question forms
    assert!(prompts[1].contains(
        "A stack is a linear data structure.\n\n--\n\nStacks follow Last In First Out order.\n\n--\n\nPush and pop operate on the top."
    ));
    assert!(prompts[1].contains("Original Question: What is a stack?"));
    assert!(prompts[1].contains("Transformed Question: What is a stack?"));
    assert!(!prompts[1].contains("Chat History:"));

    // Second rewrite is grounded in the first exchange
    assert!(prompts[2].contains("user: What is a stack?"));
    assert!(prompts[2].contains("assistant: A stack is a LIFO data structure."));
    assert!(prompts[2].contains("Follow Up user Question: What about its use cases?"));

    // The rewritten question is what gets embedded
    assert_eq!(
        embedder.texts(),
        vec!["What is a stack?", "What are the use cases of a stack?"]
    );

    // Second answer prompt includes history and the rewritten question
    assert!(prompts[3].contains("Chat History:\nuser: What is a stack?"));
    assert!(prompts[3].contains("Original Question: What about its use cases?"));
    assert!(prompts[3].contains("Transformed Question: What are the use cases of a stack?"));

    let history = repl.session().history();
    assert_eq!(history.len(), 4);
    assert_eq!(history.turns()[2].content(), "What about its use cases?");
    assert_eq!(
        history.turns()[3].content(),
        "Stacks back function calls and undo history."
    );

    let output = output_text(&repl);
    assert!(output.contains("=== AI Response ===\nA stack is a LIFO data structure.\n==================="));
    assert!(output.ends_with("Goodbye!\n"));
}

#[tokio::test]
async fn test_retrieval_failure_leaves_history_and_continues() {
    let llm = ScriptedLlm::new(vec![
        Ok("What is a heap?".to_string()),
        Ok("What is a heap?".to_string()),
        Ok("A heap is a complete binary tree.".to_string()),
    ]);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![
        Err(Error::retrieval(
            ServiceFailure::new("Pinecone query failed").with_status(503),
        )),
        Ok(vec![chunk("h1", Some("Heaps are complete binary trees."), 0.9)]),
    ]);

    let input = ScriptedInput::lines(&["What is a heap?", "What is a heap?", "exit"]);
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    let outcome = repl.run().await.unwrap();

    assert_eq!(outcome.turns_completed, 1);
    assert_eq!(repl.session().history().len(), 2);
    assert!(output_text(&repl).contains("Sorry, something went wrong"));
}

#[tokio::test]
async fn test_generation_failure_leaves_history_untouched() {
    let llm = ScriptedLlm::new(vec![
        Ok("What is a trie?".to_string()),
        Err(Error::generation(ServiceFailure::new("Resource exhausted").with_status(429))),
    ]);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![Ok(vec![chunk("t1", Some("Tries store prefixes."), 0.8)])]);

    let input = ScriptedInput::lines(&["What is a trie?", "exit"]);
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    let outcome = repl.run().await.unwrap();

    assert_eq!(outcome.status, ExitStatus::Normal);
    assert_eq!(outcome.turns_completed, 0);
    assert!(repl.session().history().is_empty());
}

#[tokio::test]
async fn test_embedding_failure_skips_search() {
    let llm = ScriptedLlm::new(vec![Ok("What is a graph?".to_string())]);
    let embedder = Arc::new(RecordingEmbedder {
        fail: true,
        ..Default::default()
    });
    let index = ScriptedIndex::new(vec![]);

    let input = ScriptedInput::lines(&["What is a graph?", "exit"]);
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    repl.run().await.unwrap();

    assert_eq!(index.searches(), 0);
    // Only the rewrite call reached the model
    assert_eq!(llm.prompts().len(), 1);
    assert!(repl.session().history().is_empty());
}

#[tokio::test]
async fn test_rewrite_failure_falls_back_to_original_question() {
    let llm = ScriptedLlm::new(vec![
        Err(Error::generation("connection reset")),
        Ok("Merge sort runs in O(n log n).".to_string()),
    ]);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![Ok(vec![chunk("m1", Some("Merge sort is O(n log n)."), 0.9)])]);

    let input = ScriptedInput::lines(&["how fast is merge sort", "exit"]);
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    let outcome = repl.run().await.unwrap();

    assert_eq!(outcome.turns_completed, 1);
    assert_eq!(embedder.texts(), vec!["how fast is merge sort"]);
    assert!(llm.prompts()[1].contains("Transformed Question: how fast is merge sort"));
}

#[tokio::test]
async fn test_no_usable_context_still_answers() {
    for results in [
        Vec::new(),
        vec![chunk("x", None, 0.7), chunk("y", Some(""), 0.6)],
    ] {
        let llm = ScriptedLlm::new(vec![
            Ok("What is a skip list?".to_string()),
            Ok("I could not find the answer in the provided documents".to_string()),
        ]);
        let embedder = Arc::new(RecordingEmbedder::default());
        let index = ScriptedIndex::new(vec![Ok(results)]);

        let input = ScriptedInput::lines(&["What is a skip list?", "exit"]);
        let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
        let outcome = repl.run().await.unwrap();

        assert_eq!(outcome.turns_completed, 1);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[1].contains("Context:"));
        assert!(output_text(&repl).contains("No relevant context was found in the documents."));
        assert_eq!(repl.session().history().len(), 2);
    }
}

#[tokio::test]
async fn test_exit_in_any_case_makes_no_calls() {
    for keyword in ["exit", "Exit", "EXIT"] {
        let llm = ScriptedLlm::new(vec![]);
        let embedder = Arc::new(RecordingEmbedder::default());
        let index = ScriptedIndex::new(vec![]);

        let input = ScriptedInput::lines(&[keyword, "What is a stack?"]);
        let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
        let outcome = repl.run().await.unwrap();

        assert_eq!(outcome.status, ExitStatus::Normal);
        assert_eq!(repl.state(), SessionState::Stopped);
        assert!(llm.prompts().is_empty());
        assert!(embedder.texts().is_empty());
        assert_eq!(index.searches(), 0);
        assert!(output_text(&repl).ends_with("Goodbye!\n"));
    }
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let llm = ScriptedLlm::new(vec![]);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![]);

    let input = ScriptedInput::lines(&["", "   ", "exit"]);
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    let outcome = repl.run().await.unwrap();

    assert_eq!(outcome.turns_completed, 0);
    assert!(llm.prompts().is_empty());
    assert!(embedder.texts().is_empty());
    assert!(repl.session().history().is_empty());
}

#[tokio::test]
async fn test_input_failure_stops_with_nonzero_status() {
    let llm = ScriptedLlm::new(vec![]);
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![]);

    let input = ScriptedInput(VecDeque::from(vec![Err(Error::Input("stdin closed".to_string()))]));
    let mut repl = SessionLoop::new(session(&llm, &embedder, &index), input, Vec::new());
    let outcome = repl.run().await.unwrap();

    assert_eq!(outcome.status, ExitStatus::InputFailure);
    assert_ne!(outcome.status.code(), 0);
    assert_eq!(repl.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_context_assembly_filters_unusable_chunks() {
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![Ok(vec![
        chunk("1", Some("A"), 0.9),
        chunk("2", None, 0.8),
        chunk("3", Some(""), 0.7),
        chunk("4", Some("B"), 0.6),
    ])]);

    let retriever = ContextRetriever::new(embedder, index, 10);
    let context = retriever.retrieve("anything").await.unwrap();

    assert!(context.found());
    assert_eq!(context.context_text.as_deref(), Some("A\n\n--\n\nB"));
    // All matches are kept with their scores
    assert_eq!(context.chunks.len(), 4);
    assert!((context.chunks[3].score - 0.6).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_dimension_check_against_index() {
    let embedder = Arc::new(RecordingEmbedder::default());
    let index = ScriptedIndex::new(vec![]);
    let retriever = ContextRetriever::new(embedder, index, 10);
    assert!(retriever.verify_dimensions().await.is_ok());
}
