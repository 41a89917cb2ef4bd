//! Gemini text embeddings (text-embedding-004)
//!
//! Queries are embedded with task type `RETRIEVAL_QUERY`, indexed chunks
//! with `RETRIEVAL_DOCUMENT`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::GeminiApi;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::http::{retry_with_backoff, send_json};

/// Maximum requests per batchEmbedContents call
const MAX_BATCH_SIZE: usize = 100;

/// Gemini embedding provider
pub struct GeminiEmbedder {
    api: GeminiApi,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Create a new embedder
    pub fn new(api: GeminiApi, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            api,
            model: model.into(),
            dimensions,
        }
    }

    fn request(&self, text: &str, task_type: &'static str) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            task_type,
        }
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|t| self.request(t, "RETRIEVAL_DOCUMENT"))
                .collect(),
        };
        let api = &self.api;
        let model = self.model.as_str();
        let request = &request;

        let response: BatchEmbedResponse = retry_with_backoff(api.max_retries(), || async move {
            send_json(
                api.post(model, "batchEmbedContents"),
                request,
                "Gemini batchEmbedContents",
            )
            .await
            .map_err(Error::Embedding)
        })
        .await?;

        if response.embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Gemini returned {} embeddings for {} texts",
                response.embeddings.len(),
                texts.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = self.request(text, "RETRIEVAL_QUERY");
        let api = &self.api;
        let model = self.model.as_str();
        let request = &request;

        let response: EmbedResponse = retry_with_backoff(api.max_retries(), || async move {
            send_json(api.post(model, "embedContent"), request, "Gemini embedContent")
                .await
                .map_err(Error::Embedding)
        })
        .await?;

        if response.embedding.values.is_empty() {
            return Err(Error::embedding("Gemini returned an empty embedding"));
        }

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            embeddings.extend(self.embed_documents(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.api.model_available(&self.model).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
