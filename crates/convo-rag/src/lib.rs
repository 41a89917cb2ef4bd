//! convo-rag: conversational question answering over your documents
//!
//! Each question is rewritten into a standalone query using the conversation
//! so far, matched against a Pinecone index, and answered by a chat model
//! that is told to use only the retrieved context. Gemini or a local Ollama
//! server provide embeddings and chat; documents are indexed with the
//! ingestion pipeline.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod session;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result, ServiceFailure};
pub use generation::{AnswerComposer, QueryRewriter};
pub use providers::{EmbeddingProvider, IndexStats, LlmProvider, ProviderSet, VectorStoreProvider};
pub use retrieval::{ContextRetriever, RetrievedContext};
pub use session::{ChatSession, ExitStatus, LineSource, SessionLoop, SessionOutcome, SessionState};
pub use types::{ChatMessage, ConversationHistory, Query, RetrievedChunk, Role, Turn};
