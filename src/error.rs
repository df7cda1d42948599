//! Error types for the page engine.

use thiserror::Error;

/// Main error type for page operations.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid breakpoint: {0}")]
    InvalidBreakpoint(String),

    #[error("Template subscription failed: {0}")]
    Subscribe(#[from] EvaluatorError),

    #[error("Resolve session is closed")]
    SessionClosed,
}

impl From<serde_json::Error> for PageError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            PageError::Deserialization(e.to_string())
        } else {
            PageError::Serialization(e.to_string())
        }
    }
}

/// Failure reported by an external template evaluator while setting up a
/// subscription.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EvaluatorError(pub String);

impl EvaluatorError {
    pub fn new(message: impl Into<String>) -> Self {
        EvaluatorError(message.into())
    }
}

/// Result type for page operations.
pub type Result<T> = std::result::Result<T, PageError>;
