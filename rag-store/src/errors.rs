//! Unified error types for the crate.

use ai_llm_service::{AiLlmError, ErrorClass};
use thiserror::Error;

/// Crate result alias.
pub type Result<T> = std::result::Result<T, RagError>;

/// Top-level error for rag-store operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("[RAG Store] config error: {0}")]
    Config(String),

    /// Vector does not match the collection dimensionality.
    #[error("[RAG Store] vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Embedding provider failed with a non-degradable error.
    #[error("[RAG Store] embedding failed: {0}")]
    Embedding(#[from] AiLlmError),

    /// Qdrant client errors (wrapped).
    #[error("[RAG Store] qdrant error: {0}")]
    Qdrant(String),

    /// Vector index failure reported by a non-Qdrant backend.
    #[error("[RAG Store] index error: {0}")]
    Index(String),
}

impl RagError {
    /// Classification used by callers for retry decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            RagError::Embedding(e) => e.class(),
            RagError::Qdrant(_) | RagError::Index(_) => ErrorClass::Transient,
            RagError::Config(_) | RagError::VectorSizeMismatch { .. } => ErrorClass::Fatal,
        }
    }
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        RagError::Qdrant(e.to_string())
    }
}
