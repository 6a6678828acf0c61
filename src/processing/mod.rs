//! Document processing pipeline: chunking, generation, merge, and format repair.

pub mod artifact;
pub mod chunking;
pub(crate) mod prompts;
mod service;
pub mod summarize;
pub mod types;
pub mod validation;

pub use artifact::{ArtifactError, TempArtifact};
pub use service::Pipeline;
pub use summarize::MapReduceSummarizer;
pub use types::{
    ArtifactKind, Chunk, Document, NO_TEXT_SENTINEL, RunMode, generation_error_sentinel,
    is_sentinel,
};
pub use validation::Grammar;
