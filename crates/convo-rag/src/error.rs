//! Error types for the conversational RAG pipeline

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Details of a failed call to an external service.
///
/// Carries the HTTP status and the raw response body (when the service
/// returned one) so turn-level logging can report the nested payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    /// Human readable description
    pub message: String,
    /// HTTP status code returned by the service
    pub status: Option<u16>,
    /// Raw error payload returned by the service
    pub payload: Option<String>,
}

impl ServiceFailure {
    /// Create a failure with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            payload: None,
        }
    }

    /// Attach an HTTP status code
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the service's error payload; blank payloads are ignored
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        if !payload.trim().is_empty() {
            self.payload = Some(payload);
        }
        self
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        Ok(())
    }
}

impl From<String> for ServiceFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ServiceFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding service failure
    #[error("Embedding generation failed: {0}")]
    Embedding(ServiceFailure),

    /// Vector index failure
    #[error("Vector retrieval failed: {0}")]
    Retrieval(ServiceFailure),

    /// Chat completion failure
    #[error("Generation failed: {0}")]
    Generation(ServiceFailure),

    /// Blank user input
    #[error("Question is empty")]
    EmptyInput,

    /// Reading user input failed
    #[error("Input error: {0}")]
    Input(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(failure: impl Into<ServiceFailure>) -> Self {
        Self::Embedding(failure.into())
    }

    /// Create a retrieval error
    pub fn retrieval(failure: impl Into<ServiceFailure>) -> Self {
        Self::Retrieval(failure.into())
    }

    /// Create a generation error
    pub fn generation(failure: impl Into<ServiceFailure>) -> Self {
        Self::Generation(failure.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The external service failure behind this error, if any
    pub fn service_failure(&self) -> Option<&ServiceFailure> {
        match self {
            Error::Embedding(f) | Error::Retrieval(f) | Error::Generation(f) => Some(f),
            _ => None,
        }
    }
}
