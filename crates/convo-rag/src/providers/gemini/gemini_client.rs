//! Gemini chat completion client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::GeminiApi;
use crate::error::{Error, Result};
use crate::providers::http::{retry_with_backoff, send_json};
use crate::providers::llm::LlmProvider;
use crate::types::{ChatMessage, Role};

/// Gemini client for answer generation and query rewriting
pub struct GeminiClient {
    api: GeminiApi,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    /// * `api` - Shared API handle
    /// * `model` - Model name (e.g., "gemini-2.0-flash-exp")
    /// * `temperature` - Sampling temperature
    pub fn new(api: GeminiApi, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            api,
            model: model.into(),
            temperature,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Gemini names the assistant role "model"
fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_request(messages: &[ChatMessage], temperature: f32) -> GenerateRequest {
    GenerateRequest {
        contents: messages
            .iter()
            .map(|m| Content {
                role: gemini_role(m.role),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect(),
        generation_config: GenerationConfig { temperature },
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::generation(format!(
            "Gemini blocked the prompt: {}",
            reason
        )));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::generation("No candidates in Gemini response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(Error::generation(format!(
            "Gemini returned no text (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = build_request(messages, self.temperature);
        let api = &self.api;
        let model = self.model.as_str();
        let request = &request;

        let response: GenerateResponse = retry_with_backoff(api.max_retries(), || async move {
            send_json(
                api.post(model, "generateContent"),
                request,
                "Gemini generateContent",
            )
            .await
            .map_err(Error::Generation)
        })
        .await?;

        let text = extract_text(response)?;
        tracing::debug!("Gemini {} returned {} chars", self.model, text.len());
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        self.api.model_available(&self.model).await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
