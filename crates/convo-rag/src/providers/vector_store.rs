//! Vector store provider trait for nearest-neighbour search

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexRecord, RetrievedChunk};

/// Index-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Vector dimensionality, when the index reports it
    pub dimension: Option<usize>,
    /// Total vectors stored
    pub total_vectors: u64,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PineconeIndex`: Pinecone serverless / pod index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Return the `top_k` nearest chunks with their metadata text.
    ///
    /// Matches without text metadata are returned with `text = None`;
    /// filtering them is the caller's job.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Insert or overwrite records, returning how many were written
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize>;

    /// Get index statistics
    async fn stats(&self) -> Result<IndexStats>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
