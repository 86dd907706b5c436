//! Error types for docscout.
//!
//! A single error enum covers configuration, I/O, language-model, embedding,
//! loading, indexing and prompt failures. Recoverable failures are logged and
//! degraded where they happen; everything that reaches a caller is an `AppError`.

use thiserror::Error;

/// Unified error type for docscout.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language-model provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Document loading and chunking errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Semantic or lexical index errors
    #[error("Index error: {0}")]
    Index(String),

    /// The answer pipeline was invoked before an index was built or loaded.
    #[error("Index not initialized: {0}")]
    IndexNotInitialized(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// True for the fatal "no index yet" precondition failure.
    pub fn is_index_not_initialized(&self) -> bool {
        matches!(self, AppError::IndexNotInitialized(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Index(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Render an error for end users, with the standard escalation hint appended.
pub fn user_facing_message(message: &str) -> String {
    format!(
        "{}\nIf this keeps happening, please contact your administrator.",
        message
    )
}
