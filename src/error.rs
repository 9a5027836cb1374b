//! Recall error types

use thiserror::Error;

/// Recall error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding provider error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Extraction or summarization oracle error
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Memory item error
    #[error("Memory error: {0}")]
    Memory(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for recall operations
pub type Result<T> = std::result::Result<T, Error>;
