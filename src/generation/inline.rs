//! Inline backend: one direct call through an injected transport.
//!
//! The transport is a capability supplied by the host. When none is supplied the backend is
//! still constructible and answers every request with a failed result, so a batch over many
//! documents keeps going. Prompts longer than the configured cap are cut; callers that need the
//! whole text must chunk beforehand.

use super::{GenerationRequest, GenerationResult, TextGenerator};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Appended to a prompt that had to be cut to the inline cap.
pub const TRUNCATION_MARKER: &str = "\n\n[...truncated...]";

/// Errors surfaced by an inline transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Injected single-call text generation capability.
#[async_trait]
pub trait InlineTransport: Send + Sync {
    /// Complete `prompt`, giving up after `timeout`.
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, TransportError>;
}

/// [`TextGenerator`] over an optional [`InlineTransport`].
pub struct InlineGenerator {
    transport: Option<Arc<dyn InlineTransport>>,
    max_prompt_chars: usize,
}

impl InlineGenerator {
    /// Wrap a transport. `None` models an absent capability.
    pub fn new(transport: Option<Arc<dyn InlineTransport>>, max_prompt_chars: usize) -> Self {
        Self {
            transport,
            max_prompt_chars,
        }
    }
}

#[async_trait]
impl TextGenerator for InlineGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let Some(transport) = self.transport.as_ref() else {
            tracing::warn!("Inline backend requested but no transport is configured");
            return GenerationResult::failed("inline backend unavailable");
        };

        let prompt = truncate_prompt(&request.prompt, self.max_prompt_chars);
        if matches!(prompt, Cow::Owned(_)) {
            tracing::debug!(
                max_chars = self.max_prompt_chars,
                "Inline prompt exceeded cap; truncated"
            );
        }

        match transport.complete(&prompt, request.timeout()).await {
            Ok(text) if text.trim().is_empty() => GenerationResult::failed("empty output"),
            Ok(text) => GenerationResult::ok(text),
            Err(error) => {
                tracing::warn!(error = %error, "Inline generation failed");
                GenerationResult::failed(error.to_string())
            }
        }
    }
}

/// Cut `prompt` to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_prompt(prompt: &str, max_chars: usize) -> Cow<'_, str> {
    match prompt.char_indices().nth(max_chars) {
        None => Cow::Borrowed(prompt),
        Some((byte_offset, _)) => {
            let mut truncated = String::with_capacity(byte_offset + TRUNCATION_MARKER.len());
            truncated.push_str(&prompt[..byte_offset]);
            truncated.push_str(TRUNCATION_MARKER);
            Cow::Owned(truncated)
        }
    }
}

/// Inline transport backed by a local Ollama runtime.
pub struct OllamaTransport {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaTransport {
    /// Target `base_url` (e.g. `http://127.0.0.1:11434`) with `model`.
    pub fn new(base_url: &str, model: &str) -> Self {
        let http = Client::builder()
            .user_agent("papernote/inline")
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl InlineTransport for OllamaTransport {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, TransportError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                TransportError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TransportError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            TransportError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(TransportError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
