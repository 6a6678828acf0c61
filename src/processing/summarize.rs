//! Chunk → partials → merge orchestration for documents too large for one call.
//!
//! Partials are generated per chunk and always kept in chunk order. A failed chunk contributes
//! a placeholder instead of aborting the run, a failed merge falls back to the concatenated
//! partials, and the chosen text is repaired against the artifact's grammar before returning.
//! With `concurrency > 1` chunk calls overlap, but `buffered` still yields them in order and a
//! failing call never cancels its siblings.

use super::chunking::split;
use super::prompts::{chunk_prompt, merge_prompt};
use super::types::{ArtifactKind, Chunk, Document};
use crate::config::{Backend, Config};
use crate::generation::{GenerationRequest, GenerationResult, TextGenerator};
use crate::metrics::PipelineMetrics;
use futures_util::{StreamExt, stream};

/// Map-reduce summarizer over a borrowed generator.
pub struct MapReduceSummarizer<'a> {
    generator: &'a dyn TextGenerator,
    metrics: &'a PipelineMetrics,
    max_chunk_size: usize,
    timeout_seconds: u64,
    backend: Backend,
    concurrency: usize,
}

impl<'a> MapReduceSummarizer<'a> {
    /// Build a summarizer using the chunking, timeout, backend, and concurrency settings of
    /// `config`.
    pub fn new(
        generator: &'a dyn TextGenerator,
        metrics: &'a PipelineMetrics,
        config: &Config,
    ) -> Self {
        Self {
            generator,
            metrics,
            max_chunk_size: config.max_chunk_size,
            timeout_seconds: config.timeout_seconds,
            backend: config.backend,
            concurrency: config.chunk_concurrency.max(1),
        }
    }

    /// Produce one final result for `document`.
    ///
    /// The result only reports failure when there was nothing usable at all: a blank document,
    /// a single chunk whose call failed, or every chunk failing.
    pub async fn run(&self, document: &Document, kind: ArtifactKind) -> GenerationResult {
        let chunks = split(document.text(), self.max_chunk_size);
        let total = chunks.len();
        tracing::info!(
            kind = kind.label(),
            chars = document.len(),
            chunks = total,
            "Summarizing in chunks"
        );
        if total == 0 {
            return GenerationResult::failed("document has no text");
        }

        let partials: Vec<GenerationResult> = stream::iter(chunks.iter())
            .map(|chunk| self.generate_partial(kind, chunk))
            .buffered(self.concurrency)
            .collect()
            .await;

        let grammar = kind.grammar();
        if total == 1 {
            return match partials.into_iter().next() {
                Some(partial) if partial.success => {
                    GenerationResult::ok(grammar.repair(&partial.output))
                }
                Some(partial) => partial,
                None => GenerationResult::failed("no partial produced"),
            };
        }

        if partials.iter().all(|partial| !partial.success) {
            tracing::warn!(
                kind = kind.label(),
                chunks = total,
                "Every chunk failed; skipping merge"
            );
            let detail = partials
                .first()
                .map(|partial| partial.error_detail.clone())
                .unwrap_or_default();
            return GenerationResult::failed(detail);
        }

        let combined = partials
            .iter()
            .zip(&chunks)
            .map(|(partial, chunk)| self.partial_text(partial, chunk))
            .collect::<Vec<_>>()
            .join(kind.separator());

        tracing::info!(kind = kind.label(), parts = total, "Merging partials");
        let merge = self
            .generator
            .generate(&self.request(merge_prompt(kind, &combined)))
            .await;

        let chosen = if merge.success {
            merge.output
        } else {
            tracing::warn!(
                kind = kind.label(),
                error = %merge.error_detail,
                "Merge failed; falling back to concatenated partials"
            );
            self.metrics.record_merge_fallback();
            combined
        };
        GenerationResult::ok(grammar.repair(&chosen))
    }

    async fn generate_partial(&self, kind: ArtifactKind, chunk: &Chunk<'_>) -> GenerationResult {
        tracing::debug!(index = chunk.index, total = chunk.total, "Generating partial");
        let result = self
            .generator
            .generate(&self.request(chunk_prompt(kind, chunk)))
            .await;
        if !result.success {
            tracing::warn!(
                index = chunk.index,
                total = chunk.total,
                error = %result.error_detail,
                "Chunk generation failed"
            );
        }
        result
    }

    fn partial_text(&self, partial: &GenerationResult, chunk: &Chunk<'_>) -> String {
        if partial.success {
            partial.output.trim().to_string()
        } else {
            self.metrics.record_chunk_placeholder();
            chunk_placeholder(chunk.index, &partial.error_detail)
        }
    }

    fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest::new(prompt, self.timeout_seconds, self.backend)
    }
}

/// Stand-in text for a chunk whose generation call failed.
pub fn chunk_placeholder(index: usize, detail: &str) -> String {
    format!("[chunk {index} generation error: {detail}]")
}
