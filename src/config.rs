use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_MAX_CHUNK_SIZE: usize = 30_000;
const DEFAULT_DIRECT_MODE_THRESHOLD: usize = 40_000;
const DEFAULT_WORK_DIR: &str = "tmp/work";
const DEFAULT_AGENT_EXECUTABLE: &str = "claude";
const DEFAULT_TIMEOUT_SECONDS: u64 = 600;
const DEFAULT_INLINE_MAX_PROMPT_CHARS: usize = 100_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for one pipeline instance.
///
/// The value is handed to [`crate::processing::Pipeline::new`]; nothing reads it from a global,
/// so pipelines with different settings can live side by side.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound, in characters, for a single chunk in the map-reduce path.
    pub max_chunk_size: usize,
    /// Documents at or below this character count are sent in a single call.
    pub direct_mode_threshold: usize,
    /// Pipeline-local directory for temp artifacts. Never the host's shared temp area.
    pub work_dir: PathBuf,
    /// Executable spawned by the delegated backend.
    pub agent_executable: PathBuf,
    /// Per-call timeout enforced on the delegated process wait.
    pub timeout_seconds: u64,
    /// Hard cap on prompt length accepted by the inline backend.
    pub inline_max_prompt_chars: usize,
    /// Backend used for direct, chunk, and merge calls.
    pub backend: Backend,
    /// How documents above the direct threshold are handled.
    pub large_document_strategy: LargeDocumentStrategy,
    /// Number of chunk calls allowed in flight at once. `1` keeps calls sequential.
    pub chunk_concurrency: usize,
    /// Optional base URL of an Ollama runtime backing the inline transport.
    pub ollama_url: Option<String>,
    /// Optional model name used with the Ollama transport.
    pub ollama_model: Option<String>,
}

/// Generation backends a request can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Direct single-call invocation through an injected transport.
    Inline,
    /// External agent process.
    Delegated,
}

/// Strategy applied to documents larger than the direct-mode threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LargeDocumentStrategy {
    /// Chunk the document, generate partials, and merge them.
    MapReduce,
    /// Hand the whole document to the delegated agent through a temp artifact.
    WholeDocument,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            direct_mode_threshold: DEFAULT_DIRECT_MODE_THRESHOLD,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            agent_executable: PathBuf::from(DEFAULT_AGENT_EXECUTABLE),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            inline_max_prompt_chars: DEFAULT_INLINE_MAX_PROMPT_CHARS,
            backend: Backend::Delegated,
            large_document_strategy: LargeDocumentStrategy::MapReduce,
            chunk_concurrency: 1,
            ollama_url: None,
            ollama_model: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// A `.env` file in the working directory is honoured. Blank variables are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let config = Self {
            max_chunk_size: parse_optional("PAPERNOTE_MAX_CHUNK_SIZE")?
                .unwrap_or(defaults.max_chunk_size),
            direct_mode_threshold: parse_optional("PAPERNOTE_DIRECT_THRESHOLD")?
                .unwrap_or(defaults.direct_mode_threshold),
            work_dir: load_env_optional("PAPERNOTE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            agent_executable: load_env_optional("PAPERNOTE_AGENT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.agent_executable),
            timeout_seconds: parse_optional("PAPERNOTE_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.timeout_seconds),
            inline_max_prompt_chars: parse_optional("PAPERNOTE_INLINE_MAX_PROMPT_CHARS")?
                .unwrap_or(defaults.inline_max_prompt_chars),
            backend: parse_optional("PAPERNOTE_BACKEND")?.unwrap_or(defaults.backend),
            large_document_strategy: parse_optional("PAPERNOTE_LARGE_STRATEGY")?
                .unwrap_or(defaults.large_document_strategy),
            chunk_concurrency: parse_optional("PAPERNOTE_CHUNK_CONCURRENCY")?
                .unwrap_or(defaults.chunk_concurrency),
            ollama_url: load_env_optional("OLLAMA_URL"),
            ollama_model: load_env_optional("OLLAMA_MODEL"),
        };
        config.validate()?;
        tracing::debug!(
            max_chunk_size = config.max_chunk_size,
            direct_mode_threshold = config.direct_mode_threshold,
            work_dir = %config.work_dir.display(),
            backend = ?config.backend,
            strategy = ?config.large_document_strategy,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject settings the pipeline cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("PAPERNOTE_MAX_CHUNK_SIZE".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue("PAPERNOTE_TIMEOUT_SECONDS".into()));
        }
        if self.chunk_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "PAPERNOTE_CHUNK_CONCURRENCY".into(),
            ));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "delegated" => Ok(Self::Delegated),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for LargeDocumentStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "map-reduce" | "mapreduce" => Ok(Self::MapReduce),
            "whole-document" | "delegated" => Ok(Self::WholeDocument),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_chunk_size, 30_000);
        assert_eq!(config.direct_mode_threshold, 40_000);
        assert_eq!(config.large_document_strategy, LargeDocumentStrategy::MapReduce);
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let config = Config {
            max_chunk_size: 0,
            ..Config::default()
        };
        let error = config.validate().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(name) if name == "PAPERNOTE_MAX_CHUNK_SIZE"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            chunk_concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Inline".parse::<Backend>(), Ok(Backend::Inline));
        assert_eq!("DELEGATED".parse::<Backend>(), Ok(Backend::Delegated));
        assert!("remote".parse::<Backend>().is_err());
    }

    #[test]
    fn strategy_accepts_common_spellings() {
        assert_eq!(
            "map_reduce".parse::<LargeDocumentStrategy>(),
            Ok(LargeDocumentStrategy::MapReduce)
        );
        assert_eq!(
            "whole-document".parse::<LargeDocumentStrategy>(),
            Ok(LargeDocumentStrategy::WholeDocument)
        );
    }
}
