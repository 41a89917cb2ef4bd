//! Context retrieval: embed the query, search the index, assemble context

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::RetrievedChunk;

/// Separator placed between chunk texts in the assembled context
pub const CONTEXT_DELIMITER: &str = "\n\n--\n\n";

/// Default number of nearest neighbours requested
pub const DEFAULT_TOP_K: usize = 10;

/// Outcome of one retrieval
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Embedding of the searched query
    pub query_vector: Vec<f32>,
    /// Every match returned by the index, in index order, scores preserved
    pub chunks: Vec<RetrievedChunk>,
    /// Joined text of the usable chunks; `None` when nothing usable came back
    pub context_text: Option<String>,
}

impl RetrievedContext {
    /// Whether any usable context was found
    pub fn found(&self) -> bool {
        self.context_text.is_some()
    }

    /// Number of matches that contributed text
    pub fn usable_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.usable_text().is_some()).count()
    }
}

/// Join the usable chunk texts in received order.
///
/// Returns `None` when no chunk has text or the joined text is blank.
pub fn assemble_context(chunks: &[RetrievedChunk]) -> Option<String> {
    let context = chunks
        .iter()
        .filter_map(|c| c.usable_text())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    if context.trim().is_empty() {
        None
    } else {
        Some(context)
    }
}

/// Fetches relevant chunk text for a query
pub struct ContextRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    top_k: usize,
}

impl ContextRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            top_k,
        }
    }

    /// Retrieve context for `query` with the configured `top_k`
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        self.retrieve_with_k(query, self.top_k).await
    }

    /// Retrieve context for `query` from the `k` nearest chunks.
    ///
    /// Embedding and search failures propagate; an empty or unusable result
    /// is reported through `found() == false`, not as an error.
    pub async fn retrieve_with_k(&self, query: &str, k: usize) -> Result<RetrievedContext> {
        let query_vector = self.embedder.embed(query).await?;
        let chunks = self.vector_store.search(&query_vector, k).await?;
        let context_text = assemble_context(&chunks);

        let context = RetrievedContext {
            query_vector,
            chunks,
            context_text,
        };
        tracing::debug!(
            matches = context.chunks.len(),
            usable = context.usable_chunks(),
            found = context.found(),
            "Retrieved context"
        );

        Ok(context)
    }

    /// Check the embedding dimensions against the index.
    ///
    /// A mismatch is a configuration error; an index that does not report
    /// its dimension is accepted with a warning.
    pub async fn verify_dimensions(&self) -> Result<()> {
        let expected = self.embedder.dimensions();
        let stats = self.vector_store.stats().await?;

        match stats.dimension {
            Some(actual) if actual != expected => Err(Error::config(format!(
                "Embedding dimension mismatch: embedder produces {} but the index stores {}",
                expected, actual
            ))),
            Some(_) => {
                tracing::debug!(
                    dimension = expected,
                    total_vectors = stats.total_vectors,
                    "Index dimensions verified"
                );
                Ok(())
            }
            None => {
                tracing::warn!(
                    "Index did not report its dimension; cannot verify against {}",
                    expected
                );
                Ok(())
            }
        }
    }
}
