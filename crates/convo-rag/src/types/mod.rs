//! Core types for the conversational RAG pipeline

pub mod chunk;
pub mod conversation;
pub mod message;
pub mod query;

pub use chunk::{IndexRecord, RetrievedChunk};
pub use conversation::{ConversationHistory, Role, Turn};
pub use message::ChatMessage;
pub use query::Query;
