//! Error handling and custom error types
//!
//! Every pipeline stage reports failures through [`Error`]. All variants are
//! fatal to a run; the only distinction drawn here is whether a failure is
//! worth retrying at the call site that produced it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keyword extraction error: {0}")]
    Extraction(String),

    #[error("Generation service error: {message}")]
    GenerationService { message: String, transient: bool },

    #[error("Failed to write scene script {}: {source}", path.display())]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("3D application not found (tried: {0})")]
    ApplicationNotFound(String),

    #[error("3D application run failed ({status})")]
    Execution { status: String, code: Option<i32> },

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Permanent generation-service failure (rejected request, malformed body).
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationService {
            message: message.into(),
            transient: false,
        }
    }

    /// Generation-service failure that may succeed on a later attempt.
    pub fn generation_transient(message: impl Into<String>) -> Self {
        Self::GenerationService {
            message: message.into(),
            transient: true,
        }
    }

    /// Whether a retry policy may attempt the failed operation again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::GenerationService { transient, .. } => *transient,
            // No exit code means the process was killed by a signal.
            Self::Execution { code, .. } => code.is_none(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
