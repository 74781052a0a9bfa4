//! Error taxonomy for the generation pipeline.
//!
//! Configuration problems are fatal and surface before any network call.
//! Generation failures are scoped to a single file; batch callers log them
//! and move on. "Nothing to do" outcomes are not errors at all and are
//! expressed through `GenerationOutcome` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid or incomplete configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no API key configured for provider '{0}' (set ai_api_key or OPENAI_API_KEY)")]
    MissingApiKey(String),

    #[error("unsupported AI provider '{0}' (expected openai or ollama)")]
    UnsupportedProvider(String),

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A model call that did not produce a response
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Failures of a single generation run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("source file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
