use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    generation_calls: AtomicU64,
    failed_calls: AtomicU64,
    chunk_placeholders: AtomicU64,
    merge_fallbacks: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one document entering the pipeline.
    pub fn record_document(&self) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generation call and whether it succeeded.
    pub fn record_generation(&self, success: bool) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a chunk whose partial was replaced by an error placeholder.
    pub fn record_chunk_placeholder(&self) {
        self.chunk_placeholders.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a merge call that fell back to concatenated partials.
    pub fn record_merge_fallback(&self) {
        self.merge_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            generation_calls: self.generation_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            chunk_placeholders: self.chunk_placeholders.load(Ordering::Relaxed),
            merge_fallbacks: self.merge_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents handed to the pipeline since construction.
    pub documents_processed: u64,
    /// Generation calls issued, successful or not.
    pub generation_calls: u64,
    /// Generation calls that reported failure.
    pub failed_calls: u64,
    /// Chunks degraded to an error placeholder.
    pub chunk_placeholders: u64,
    /// Merge calls that fell back to raw concatenation.
    pub merge_fallbacks: u64,
}
