//! Error types for the test generation pipeline
//!
//! Collaborator failures (storage, compiler process, transport) are reported
//! through [`FeedbackError`]. The feedback loop itself never surfaces these to
//! its caller: it folds them into a terminal [`crate::ExecutionResult`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type FeedbackResult<T> = Result<T, FeedbackError>;

/// Errors that can occur while generating, persisting or compiling tests
#[derive(Error, Debug)]
pub enum FeedbackError {
    /// Writing a generated test file failed
    #[error("Failed to save generated test to {path}: {message}")]
    Storage { path: PathBuf, message: String },

    /// The compiler process could not be spawned or configured
    #[error("Compiler error: {message}")]
    Compiler { message: String },

    /// The LLM transport failed (network, HTTP status, malformed body)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Configuration is invalid or could not be loaded
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A feedback outcome was built with a suite/result mismatch
    #[error("Invalid feedback outcome: {message}")]
    OutcomeInvariant { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FeedbackError {
    /// Create a storage error
    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a compiler error
    pub fn compiler(message: impl Into<String>) -> Self {
        Self::Compiler {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error is retryable (transient failure)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { message } => {
                let lower = message.to_lowercase();
                lower.contains("timeout")
                    || lower.contains("timed out")
                    || lower.contains("connection")
                    || lower.contains("429")
                    || lower.contains("503")
            }
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeedbackError::storage("/tmp/out/GeneratedTest.java", "disk full");
        assert!(err.to_string().contains("GeneratedTest.java"));
        assert!(err.to_string().contains("disk full"));

        let err = FeedbackError::config("test_suite_filename must not be empty");
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FeedbackError = io_err.into();
        assert!(matches!(err, FeedbackError::Io(_)));
    }

    #[test]
    fn test_is_retryable() {
        assert!(FeedbackError::transport("connection refused").is_retryable());
        assert!(FeedbackError::transport("HTTP 503 Service Unavailable").is_retryable());
        assert!(!FeedbackError::transport("HTTP 401 Unauthorized").is_retryable());
        assert!(!FeedbackError::compiler("javac not found").is_retryable());

        let io_err = std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted");
        let err: FeedbackError = io_err.into();
        assert!(err.is_retryable());
    }
}
