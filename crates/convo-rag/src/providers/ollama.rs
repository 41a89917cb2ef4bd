//! Ollama-based providers for embeddings and chat
//!
//! `OllamaEmbedder` and `OllamaLlm` share one `OllamaClient`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::types::ChatMessage;

use super::embedding::EmbeddingProvider;
use super::http::{retry_with_backoff, send_json};
use super::llm::LlmProvider;

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a client on top of a shared HTTP client
    pub fn new(client: Client, config: &OllamaConfig, max_retries: u32) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries,
        }
    }

    /// Check if Ollama is running
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model,
            prompt: text,
        };
        let client = &self.client;
        let (url, request) = (&url, &request);

        let response: EmbedResponse = retry_with_backoff(self.max_retries, || async move {
            send_json(client.post(url), request, "Ollama embeddings")
                .await
                .map_err(Error::Embedding)
        })
        .await?;

        if response.embedding.is_empty() {
            return Err(Error::embedding(format!(
                "Ollama returned an empty embedding (is '{}' an embedding model?)",
                model
            )));
        }

        Ok(response.embedding)
    }

    /// Run a non-streaming chat completion
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = build_chat_request(model, messages, temperature);
        let client = &self.client;
        let (url, request) = (&url, &request);

        let response: ChatResponse = retry_with_backoff(self.max_retries, || async move {
            send_json(client.post(url), request, "Ollama chat")
                .await
                .map_err(Error::Generation)
        })
        .await?;

        reply_text(response)
    }
}

/// Reply content of a chat response; a blank reply is a generation failure
fn reply_text(response: ChatResponse) -> Result<String> {
    if response.message.content.trim().is_empty() {
        return Err(Error::generation("Ollama returned no text"));
    }
    Ok(response.message.content)
}

fn build_chat_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        stream: false,
        options: ChatOptions { temperature },
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    // Ollama has no batch endpoint, so the default sequential embed_batch is used

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama chat provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
}

impl OllamaLlm {
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.client
            .chat(&self.model, messages, self.temperature)
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build the embedder and chat provider over one shared client
pub fn ollama_providers(
    client: Client,
    config: &OllamaConfig,
    max_retries: u32,
) -> (OllamaEmbedder, OllamaLlm) {
    let shared = Arc::new(OllamaClient::new(client, config, max_retries));
    (
        OllamaEmbedder::new(Arc::clone(&shared), &config.embed_model, config.dimensions),
        OllamaLlm::new(shared, &config.generate_model, config.temperature),
    )
}
