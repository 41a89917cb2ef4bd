//! Google Gemini API providers
//!
//! - `GeminiClient`: chat completion via `generateContent`
//! - `GeminiEmbedder`: embeddings via `embedContent` / `batchEmbedContents`
//!
//! Both share one `GeminiApi` handle (HTTP client, base URL and API key).

mod gemini_client;
mod gemini_embedder;

pub use gemini_client::GeminiClient;
pub use gemini_embedder::GeminiEmbedder;

use reqwest::{Client, RequestBuilder};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared connection details for the Gemini REST API
#[derive(Clone)]
pub struct GeminiApi {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiApi {
    /// Create a new API handle; fails when no API key is configured
    pub fn new(client: Client, config: &GeminiConfig, max_retries: u32) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config("GEMINI_API_KEY is not set"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries,
        })
    }

    /// URL of a model method, e.g. `models/text-embedding-004:embedContent`
    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn post(&self, model: &str, method: &str) -> RequestBuilder {
        self.client
            .post(self.model_url(model, method))
            .header(API_KEY_HEADER, &self.api_key)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
    }

    pub(crate) fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Check that the model exists and the key is accepted
    pub(crate) async fn model_available(&self, model: &str) -> Result<bool> {
        match self.get(&format!("models/{}", model)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::debug!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
