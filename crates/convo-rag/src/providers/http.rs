//! HTTP plumbing shared by the external service clients

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::HttpConfig;
use crate::error::{Error, Result, ServiceFailure};

/// Build the HTTP client used for every external call
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))
}

/// Retry an operation with exponential backoff (1s, 2s, 4s, ...).
///
/// Client errors other than 408 and 429 are returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries && is_transient(&e) => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt + 1,
                    max_retries + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Delay before retry number `attempt + 1`
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

fn is_transient(error: &Error) -> bool {
    match error.service_failure().and_then(|f| f.status) {
        Some(408) | Some(429) => true,
        Some(status) => !(400..500).contains(&status),
        None => true,
    }
}

/// Send a JSON request and decode a JSON response.
///
/// `context` names the call in error messages, e.g. "Gemini generateContent".
pub async fn send_json<B, R>(
    request: RequestBuilder,
    body: &B,
    context: &str,
) -> std::result::Result<R, ServiceFailure>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ServiceFailure::new(format!("{} request failed: {}", context, e)))?;
    read_json(response, context).await
}

/// Decode a JSON response, turning non-success statuses into failures
pub async fn read_json<R: DeserializeOwned>(
    response: Response,
    context: &str,
) -> std::result::Result<R, ServiceFailure> {
    if !response.status().is_success() {
        return Err(failure_from_response(context, response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ServiceFailure::new(format!("Failed to parse {} response: {}", context, e)))
}

/// Build a failure from a non-success response, keeping the body as payload
pub async fn failure_from_response(context: &str, response: Response) -> ServiceFailure {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match extract_error_message(&body) {
        Some(detail) => format!("{} failed: {}", context, detail),
        None => format!("{} failed", context),
    };

    ServiceFailure::new(message)
        .with_status(status.as_u16())
        .with_payload(body)
}

/// Pull a human readable message out of common JSON error shapes:
/// `{"error": {"message": ..}}`, `{"error": ".."}` and `{"message": ..}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = match value.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.as_str()),
        Some(obj) => obj.get("message").and_then(|m| m.as_str()),
        None => value.get("message").and_then(|m| m.as_str()),
    }?;
    Some(message.to_string())
}
