//! Retrieval of grounding context from the vector index

pub mod context;

pub use context::{assemble_context, ContextRetriever, RetrievedContext, CONTEXT_DELIMITER, DEFAULT_TOP_K};
