//! Structured-completion API client.
//!
//! The summarizer talks to an OpenAI-compatible `/chat/completions`
//! endpoint and constrains the answer with a JSON schema to a single
//! `summarized_text` field.
//!
//! # Architecture
//!
//! - [`StructuredCompletion`]: the async trait the summarizer is written against
//! - [`OpenAiClient`]: the production implementation over `reqwest`
//!
//! # Error classification
//!
//! Hitting the model's token budget is reported as
//! [`DigestError::LengthExceeded`], whichever way it shows up:
//! - an HTTP error with code `context_length_exceeded` (input too large)
//! - a choice with `finish_reason == "length"` (output cut off)
//! - a JSON body that ends early
//!
//! Everything else is returned as-is and treated as fatal by the caller.

use crate::error::DigestError;
use crate::http::classify_transport_error;
use crate::utils::{looks_truncated, truncate_for_log};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// One summarization request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    /// Rendered system prompt.
    pub system: &'a str,
    /// Article text.
    pub user: &'a str,
}

/// Async structured-completion service.
///
/// Implementors return the `summarized_text` field of the model's answer.
pub trait StructuredCompletion {
    async fn summarize_text(&self, request: &CompletionRequest<'_>) -> Result<String, DigestError>;
}

/// The schema-constrained answer.
#[derive(Debug, Deserialize, Serialize)]
pub struct OutputText {
    pub summarized_text: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    code: Option<String>,
}

fn response_format() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "OutputText",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "summarized_text": {
                        "type": "string",
                        "description": "Summarized text"
                    }
                },
                "required": ["summarized_text"],
                "additionalProperties": false
            }
        }
    })
}

/// Interpret a `/chat/completions` response.
///
/// # Arguments
///
/// * `status` - HTTP status code
/// * `body` - Raw response body
///
/// # Returns
///
/// The `summarized_text` on success, [`DigestError::LengthExceeded`] when the
/// token budget was hit, another error otherwise.
pub fn parse_chat_response(status: u16, body: &str) -> Result<String, DigestError> {
    if !(200..300).contains(&status) {
        return Err(match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(ApiErrorBody { error }) if error.code.as_deref() == Some("context_length_exceeded") => {
                DigestError::LengthExceeded(error.message)
            }
            Ok(ApiErrorBody { error }) => {
                DigestError::Completion(format!("HTTP {status}: {}", error.message))
            }
            Err(_) => DigestError::Completion(format!(
                "HTTP {status}: {}",
                truncate_for_log(body, 300)
            )),
        });
    }

    let response: ChatResponse = serde_json::from_str(body)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DigestError::Completion("response contained no choices".to_string()))?;

    if choice.finish_reason.as_deref() == Some("length") {
        return Err(DigestError::LengthExceeded(
            "completion stopped at the token limit".to_string(),
        ));
    }

    let content = match (choice.message.content, choice.message.refusal) {
        (Some(content), _) => content,
        (None, Some(refusal)) => {
            return Err(DigestError::Completion(format!("model refused: {refusal}")));
        }
        (None, None) => {
            return Err(DigestError::Completion("empty completion".to_string()));
        }
    };

    match serde_json::from_str::<OutputText>(&content) {
        Ok(output) => Ok(output.summarized_text),
        Err(e) if looks_truncated(&e) => Err(DigestError::LengthExceeded(format!(
            "truncated structured output: {}",
            truncate_for_log(&content, 120)
        ))),
        Err(e) => Err(e.into()),
    }
}

/// OpenAI-compatible client implementing [`StructuredCompletion`].
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (carries the run's timeout)
    /// * `base_url` - API root such as `https://api.openai.com/v1`
    /// * `api_key` - Bearer token
    pub fn new(client: Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl StructuredCompletion for OpenAiClient {
    #[instrument(level = "info", skip_all, fields(model = %request.model))]
    async fn summarize_text(&self, request: &CompletionRequest<'_>) -> Result<String, DigestError> {
        let t0 = Instant::now();
        let url = self.endpoint();
        let payload = ChatRequest {
            model: request.model,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            response_format: response_format(),
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport_error(&url, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| classify_transport_error(&url, e))?;
        let dt = t0.elapsed();

        let res = parse_chat_response(status, &body);
        match &res {
            Ok(summary) => info!(
                elapsed_ms = dt.as_millis() as u64,
                chars = summary.chars().count(),
                "Completion succeeded"
            ),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, status, error = %e, "Completion failed"),
        }
        debug!(response_preview = %truncate_for_log(&body, 300), "Completion response");
        res
    }
}
