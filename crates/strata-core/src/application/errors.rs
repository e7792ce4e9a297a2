//! Application Layer Errors

use thiserror::Error;

/// Failures surfaced by the index builder and the retrieval engine
///
/// Every variant is fatal for the operation that raised it; nothing here is
/// retried automatically.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    /// The embedding provider could not be reached or returned an error
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The provider returned a vector of the wrong size
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query text was empty or whitespace only
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    /// The vector store rejected or failed an operation
    #[error("Vector store {operation} failed: {message}")]
    VectorStoreUnavailable {
        operation: &'static str,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn store(operation: &'static str, err: anyhow::Error) -> Self {
        AppError::VectorStoreUnavailable {
            operation,
            message: format!("{err:#}"),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
