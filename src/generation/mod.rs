//! Text generation capability shared by every pipeline stage.
//!
//! Callers talk to a [`TextGenerator`]; the concrete backend is picked per request by
//! [`GenerationClient`]. Backends never return `Err`: every failure is folded into a
//! [`GenerationResult`] with `success == false` so the orchestration layer can degrade instead
//! of aborting. Nothing here retries.

pub mod delegated;
pub mod inline;

use crate::config::{Backend, Config};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use delegated::DelegatedGenerator;
pub use inline::{InlineGenerator, InlineTransport, OllamaTransport, TransportError};

/// Where the delegated agent is expected to leave its answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputChannel {
    /// Read the answer from the process's standard output.
    #[default]
    Stdout,
    /// Read the answer from a file the prompt told the agent to write.
    Artifact(PathBuf),
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Full prompt text.
    pub prompt: String,
    /// Upper bound on how long the call may block.
    pub timeout_seconds: u64,
    /// Backend the request is routed to.
    pub backend: Backend,
    /// Channel the answer is read from. Only meaningful for the delegated backend.
    pub output: OutputChannel,
}

impl GenerationRequest {
    /// Build a request that reads its answer from stdout.
    pub fn new(prompt: impl Into<String>, timeout_seconds: u64, backend: Backend) -> Self {
        Self {
            prompt: prompt.into(),
            timeout_seconds,
            backend,
            output: OutputChannel::Stdout,
        }
    }

    /// Redirect the answer to an output artifact.
    pub fn with_output(mut self, output: OutputChannel) -> Self {
        self.output = output;
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Outcome of a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Whether the backend produced usable output.
    pub success: bool,
    /// Generated text; empty on failure.
    pub output: String,
    /// Diagnostic text on failure (captured stderr, timeout marker, ...); empty on success.
    pub error_detail: String,
}

impl GenerationResult {
    /// Successful result carrying `output`.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error_detail: String::new(),
        }
    }

    /// Failed result carrying a diagnostic.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error_detail: detail.into(),
        }
    }
}

/// Capability implemented by every text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation call. Never panics on backend failure and never retries.
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;
}

/// Routes each request to the inline or delegated backend named in it.
pub struct GenerationClient {
    inline: Arc<dyn TextGenerator>,
    delegated: Arc<dyn TextGenerator>,
}

impl GenerationClient {
    /// Pair two backends.
    pub fn new(inline: Arc<dyn TextGenerator>, delegated: Arc<dyn TextGenerator>) -> Self {
        Self { inline, delegated }
    }

    /// Build the standard backend pair for a configuration.
    ///
    /// The inline backend is wired to Ollama when both `ollama_url` and `ollama_model` are set;
    /// otherwise it reports itself unavailable on every call.
    pub fn from_config(config: &Config) -> Self {
        let transport: Option<Arc<dyn InlineTransport>> =
            match (config.ollama_url.as_deref(), config.ollama_model.as_deref()) {
                (Some(url), Some(model)) => Some(Arc::new(OllamaTransport::new(url, model))),
                _ => None,
            };
        let inline = InlineGenerator::new(transport, config.inline_max_prompt_chars);
        let delegated =
            DelegatedGenerator::new(config.agent_executable.clone(), config.work_dir.clone());
        Self::new(Arc::new(inline), Arc::new(delegated))
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        match request.backend {
            Backend::Inline => self.inline.generate(request).await,
            Backend::Delegated => self.delegated.generate(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _request: &GenerationRequest) -> GenerationResult {
            GenerationResult::ok(self.0)
        }
    }

    #[tokio::test]
    async fn client_routes_by_backend() {
        let client = GenerationClient::new(Arc::new(Fixed("inline")), Arc::new(Fixed("agent")));

        let inline = client
            .generate(&GenerationRequest::new("p", 5, Backend::Inline))
            .await;
        let delegated = client
            .generate(&GenerationRequest::new("p", 5, Backend::Delegated))
            .await;

        assert_eq!(inline.output, "inline");
        assert_eq!(delegated.output, "agent");
    }

    #[tokio::test]
    async fn default_client_without_ollama_reports_unavailable_inline() {
        let client = GenerationClient::from_config(&Config::default());
        let result = client
            .generate(&GenerationRequest::new("hello", 5, Backend::Inline))
            .await;
        assert!(!result.success);
        assert!(result.error_detail.contains("unavailable"));
    }

    #[test]
    fn failed_result_has_empty_output() {
        let result = GenerationResult::failed("boom");
        assert!(!result.success);
        assert!(result.output.is_empty());
        assert_eq!(result.error_detail, "boom");
    }
}
