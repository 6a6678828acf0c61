//! Core data types shared by the processing pipeline.

use super::validation::Grammar;

/// Returned instead of content when the document has no text.
pub const NO_TEXT_SENTINEL: &str = "[no text]";

const GENERATION_ERROR_PREFIX: &str = "[generation error: ";

/// Build the sentinel returned when every generation attempt failed.
pub fn generation_error_sentinel(detail: &str) -> String {
    format!("{GENERATION_ERROR_PREFIX}{detail}]")
}

/// Whether `output` is one of the pipeline's failure sentinels rather than displayable content.
pub fn is_sentinel(output: &str) -> bool {
    output == NO_TEXT_SENTINEL || output.starts_with(GENERATION_ERROR_PREFIX)
}

/// Extracted source text handed to the pipeline. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    length: usize,
}

impl Document {
    /// Wrap extracted text. Length is measured in characters.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self { text, length }
    }

    /// Full document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character count of the text.
    pub fn len(&self) -> usize {
        self.length
    }

    /// True when the text is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True when the text holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A bounded, non-overlapping slice of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// 1-based position of the chunk.
    pub index: usize,
    /// Number of chunks the document was split into.
    pub total: usize,
    /// Slice of the document text.
    pub text: &'a str,
}

/// Which structured artifact a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Chapter-by-chapter summary.
    Summary,
    /// Four-section peer-review critique.
    Critique,
}

impl ArtifactKind {
    /// Output grammar enforced on the final text.
    pub fn grammar(self) -> Grammar {
        match self {
            Self::Summary => Grammar::summary(),
            Self::Critique => Grammar::critique(),
        }
    }

    /// Separator placed between partials when they are combined.
    pub fn separator(self) -> &'static str {
        match self {
            Self::Summary => "\n\n",
            Self::Critique => "\n\n---\n\n",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Critique => "critique",
        }
    }
}

/// Path a pipeline run takes, chosen from document length and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One generation call over the whole document.
    Direct,
    /// Chunk, generate partials, merge.
    MapReduce,
    /// Whole document handed to the delegated agent through a temp artifact.
    WholeDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_length_counts_characters() {
        let document = Document::new("新規性abc");
        assert_eq!(document.len(), 6);
        assert!(!document.is_blank());
        assert!(Document::new(" \n\t").is_blank());
    }

    #[test]
    fn sentinels_are_recognised() {
        assert!(is_sentinel(NO_TEXT_SENTINEL));
        assert!(is_sentinel(&generation_error_sentinel("timeout")));
        assert_eq!(generation_error_sentinel("x"), "[generation error: x]");
        assert!(!is_sentinel("# 章1\n- 要点"));
    }
}
