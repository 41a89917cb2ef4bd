//! Chunk types exchanged with the vector index

use serde::{Deserialize, Serialize};

/// A nearest-neighbour match returned by the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Vector id in the index
    pub id: String,
    /// Chunk text from the match metadata (absent when the index stored none)
    pub text: Option<String>,
    /// Similarity score as reported by the index
    pub score: f32,
}

impl RetrievedChunk {
    pub fn new(id: impl Into<String>, text: Option<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            text,
            score,
        }
    }

    /// Usable chunk text: present and non-empty
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// A chunk ready to be written to the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Deterministic vector id
    pub id: String,
    /// Embedding values
    pub values: Vec<f32>,
    /// Chunk text, stored as retrievable metadata
    pub text: String,
    /// Source document name
    pub source: String,
    /// Page number (1-indexed) when known
    pub page: Option<u32>,
    /// Position of the chunk within its document
    pub chunk_index: u32,
}
