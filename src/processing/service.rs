//! Pipeline entry point: mode selection and wiring of the generation stages.

use crate::{
    config::{Backend, Config, LargeDocumentStrategy},
    generation::{
        GenerationClient, GenerationRequest, GenerationResult, OutputChannel, TextGenerator,
    },
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        artifact::TempArtifact,
        prompts::{direct_prompt, whole_document_prompt},
        summarize::MapReduceSummarizer,
        types::{ArtifactKind, Document, NO_TEXT_SENTINEL, RunMode, generation_error_sentinel},
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Turns a [`Document`] into a chaptered summary and a four-section critique.
///
/// The pipeline owns its configuration and a shared handle to a [`TextGenerator`]; construct it
/// once and reuse it across documents. Every public method returns a string: either text
/// conforming to the requested grammar, or a sentinel (see [`crate::processing::is_sentinel`]).
/// Nothing raises past this boundary.
pub struct Pipeline {
    config: Config,
    generator: MeteredGenerator,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Build a pipeline over an injected generator.
    pub fn new(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        let metrics = Arc::new(PipelineMetrics::new());
        Self {
            config,
            generator: MeteredGenerator {
                inner: generator,
                metrics: metrics.clone(),
            },
            metrics,
        }
    }

    /// Build a pipeline with the standard inline/delegated backends for `config`.
    pub fn from_config(config: Config) -> Self {
        let client = GenerationClient::from_config(&config);
        Self::new(config, Arc::new(client))
    }

    /// Configuration this pipeline was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current activity counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Path a document of this length takes under the current configuration.
    pub fn select_mode(&self, document: &Document) -> RunMode {
        if document.len() <= self.config.direct_mode_threshold {
            return RunMode::Direct;
        }
        match self.config.large_document_strategy {
            LargeDocumentStrategy::MapReduce => RunMode::MapReduce,
            LargeDocumentStrategy::WholeDocument => RunMode::WholeDocument,
        }
    }

    /// Chapter-by-chapter summary of `document`.
    pub async fn summarize(&self, document: &Document) -> String {
        self.run(document, ArtifactKind::Summary).await
    }

    /// Four-section critique of `document`.
    pub async fn critique(&self, document: &Document) -> String {
        self.run(document, ArtifactKind::Critique).await
    }

    /// Summary and critique of the same document, in that order.
    pub async fn run_both(&self, document: &Document) -> (String, String) {
        let summary = self.summarize(document).await;
        let critique = self.critique(document).await;
        (summary, critique)
    }

    /// Produce one artifact for `document`.
    ///
    /// Everything logged during the run is nested in a `document` span with a fresh run id.
    pub async fn run(&self, document: &Document, kind: ArtifactKind) -> String {
        self.metrics.record_document();
        let span = tracing::info_span!(
            "document",
            run = %Uuid::new_v4().simple(),
            kind = kind.label()
        );
        self.run_in_span(document, kind).instrument(span).await
    }

    async fn run_in_span(&self, document: &Document, kind: ArtifactKind) -> String {
        if document.is_blank() {
            tracing::info!("Document has no text; skipping generation");
            return NO_TEXT_SENTINEL.to_string();
        }

        let started = Instant::now();
        let mode = self.select_mode(document);
        tracing::info!(chars = document.len(), mode = ?mode, "Processing document");

        let result = match mode {
            RunMode::Direct => self.run_direct(document, kind).await,
            RunMode::MapReduce => {
                MapReduceSummarizer::new(&self.generator, &self.metrics, &self.config)
                    .run(document, kind)
                    .await
            }
            RunMode::WholeDocument => self.run_whole_document(document, kind).await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if result.success {
            tracing::info!(mode = ?mode, elapsed_ms, "Document processed");
            // Map-reduce output is already repaired; repair is idempotent.
            kind.grammar().repair(&result.output)
        } else {
            tracing::warn!(
                mode = ?mode,
                elapsed_ms,
                error = %result.error_detail,
                "Generation failed"
            );
            generation_error_sentinel(&result.error_detail)
        }
    }

    async fn run_direct(&self, document: &Document, kind: ArtifactKind) -> GenerationResult {
        let request = GenerationRequest::new(
            direct_prompt(kind, document.text()),
            self.config.timeout_seconds,
            self.config.backend,
        );
        self.generator.generate(&request).await
    }

    async fn run_whole_document(
        &self,
        document: &Document,
        kind: ArtifactKind,
    ) -> GenerationResult {
        let work_dir = &self.config.work_dir;
        let input = match TempArtifact::create(work_dir, "document_", document.text()) {
            Ok(artifact) => artifact,
            Err(error) => {
                tracing::error!(error = %error, "Failed to stage document for agent");
                return GenerationResult::failed(error.to_string());
            }
        };
        let output = match TempArtifact::reserve(work_dir, "result_") {
            Ok(artifact) => artifact,
            Err(error) => {
                tracing::error!(error = %error, "Failed to reserve agent output path");
                return GenerationResult::failed(error.to_string());
            }
        };

        let prompt = whole_document_prompt(
            kind,
            input.path(),
            output.path(),
            self.config.max_chunk_size,
        );
        let request = GenerationRequest::new(prompt, self.config.timeout_seconds, Backend::Delegated)
            .with_output(OutputChannel::Artifact(output.path().to_path_buf()));
        let result = self.generator.generate(&request).await;

        input.release();
        output.release();
        result
    }
}

/// Counts every generation call on its way to the real backend.
struct MeteredGenerator {
    inner: Arc<dyn TextGenerator>,
    metrics: Arc<PipelineMetrics>,
}

#[async_trait]
impl TextGenerator for MeteredGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let result = self.inner.generate(request).await;
        self.metrics.record_generation(result.success);
        result
    }
}
