//! Provider abstractions for embeddings, chat completion and vector search
//!
//! Trait-based so the session code can switch between Gemini and a local
//! Ollama server, and so tests can substitute fakes.

pub mod embedding;
pub mod gemini;
pub mod http;
pub mod llm;
pub mod ollama;
pub mod pinecone;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use vector_store::{IndexStats, VectorStoreProvider};

use std::sync::Arc;

use crate::config::{BackendProvider, RagConfig};
use crate::error::Result;

use gemini::{GeminiApi, GeminiClient, GeminiEmbedder};
use pinecone::PineconeIndex;

/// The three external services a session depends on
#[derive(Clone)]
pub struct ProviderSet {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
}

impl ProviderSet {
    /// Build providers for the configured backend.
    ///
    /// All providers share one HTTP client.
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        let client = http::build_client(&config.http)?;
        let max_retries = config.http.max_retries;

        let (embedder, llm): (Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>) =
            match config.backend {
                BackendProvider::Gemini => {
                    tracing::info!(
                        "Using Gemini backend ({} + {})",
                        config.gemini.embedding_model,
                        config.gemini.generation_model
                    );
                    let api = GeminiApi::new(client.clone(), &config.gemini, max_retries)?;
                    let embedder = GeminiEmbedder::new(
                        api.clone(),
                        &config.gemini.embedding_model,
                        config.gemini.dimensions,
                    );
                    let llm = GeminiClient::new(
                        api,
                        &config.gemini.generation_model,
                        config.gemini.temperature,
                    );
                    (Arc::new(embedder), Arc::new(llm))
                }
                BackendProvider::Ollama => {
                    tracing::info!(
                        "Using Ollama backend at {} ({} + {})",
                        config.ollama.base_url,
                        config.ollama.embed_model,
                        config.ollama.generate_model
                    );
                    let (embedder, llm) =
                        ollama::ollama_providers(client.clone(), &config.ollama, max_retries);
                    (Arc::new(embedder), Arc::new(llm))
                }
            };

        let index = PineconeIndex::connect(client, &config.pinecone, max_retries).await?;
        tracing::info!("Using Pinecone index at {}", index.host());

        Ok(Self {
            embedder,
            llm,
            vector_store: Arc::new(index),
        })
    }

    /// Health of each provider as `(name, healthy)` pairs
    pub async fn health(&self) -> Vec<(String, bool)> {
        let embedder = self.embedder.health_check().await.unwrap_or(false);
        let llm = self.llm.health_check().await.unwrap_or(false);
        let store = self.vector_store.health_check().await.unwrap_or(false);
        vec![
            (format!("embeddings ({})", self.embedder.name()), embedder),
            (format!("chat ({}, {})", self.llm.name(), self.llm.model()), llm),
            (format!("vector index ({})", self.vector_store.name()), store),
        ]
    }
}
