#![deny(missing_docs)]

//! Core library for the papernote summarization pipeline.

/// Explicit pipeline configuration loaded from the environment or built in code.
pub mod config;
/// Text generation capability and its inline/delegated backends.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline activity counters.
pub mod metrics;
/// Chunking, validation, temp artifacts, and the summarization pipeline.
pub mod processing;
