//! Error taxonomy for the Unified Vector Store core.
//!
//! Named variants let callers match on kind rather than parse messages.

use thiserror::Error;

/// Result type alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the Unified Vector Store.
#[derive(Error, Debug)]
pub enum Error {
    /// Coordinator-level input validation failed (content empty, size bound,
    /// `min_similarity` out of range, embedding dimension mismatch, ...).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Field or rule that was violated.
        field: String,
        /// Human readable description.
        message: String,
    },

    /// The embedding pipeline exhausted its model chain.
    #[error("embedding failed: {message}")]
    EmbeddingFailed {
        /// Description of the failure, including the last model tried.
        message: String,
    },

    /// A provider (primary, secondary or auxiliary) could not service a
    /// request. Fatal on primary writes, a fallback trigger on reads.
    #[error("provider '{provider}' unavailable: {message}")]
    Unavailable {
        /// Name of the provider that failed.
        provider: String,
        /// Description of the failure.
        message: String,
    },

    /// Requested resource does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Identifier or description of the missing resource.
        resource: String,
    },

    /// A numeric argument fell outside its declared range (e.g. an
    /// importance score update outside `[0, 1]`).
    #[error("out of range: {message}")]
    OutOfRange {
        /// Description of the offending value and its valid range.
        message: String,
    },

    /// A per-operation deadline elapsed before the operation completed.
    #[error("deadline exceeded after {elapsed_ms}ms: {operation}")]
    DeadlineExceeded {
        /// Name of the operation that timed out.
        operation: String,
        /// Elapsed time in milliseconds when the deadline fired.
        elapsed_ms: u64,
    },

    /// Conflict raised by a backing store (e.g. duplicate id collision).
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflicting state.
        message: String,
    },

    /// Embedding vector failed validation (wrong length, NaN/Inf).
    #[error("invalid embedding: {message}")]
    InvalidEmbedding {
        /// Description of the validation failure.
        message: String,
    },

    /// Provider reported a dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    InvalidDim {
        /// Declared store dimension.
        expected: usize,
        /// Dimension of the rejected vector.
        actual: usize,
    },

    /// Unexpected internal error. Context is logged; the message returned
    /// to callers should be sanitized before crossing a trust boundary.
    #[error("internal error: {message}")]
    Internal {
        /// Sanitized description safe to surface to callers.
        message: String,
    },

    /// JSON (de)serialization error, usually from metadata handling.
    #[error("json error: {source}")]
    Json {
        /// Underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Build an [`Error::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an [`Error::EmbeddingFailed`].
    pub fn embedding_failed(message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            message: message.into(),
        }
    }

    /// Build an [`Error::Unavailable`].
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Build an [`Error::NotFound`].
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Build an [`Error::OutOfRange`].
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }

    /// Build an [`Error::DeadlineExceeded`].
    pub fn deadline_exceeded(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::DeadlineExceeded {
            operation: operation.into(),
            elapsed_ms,
        }
    }

    /// Build an [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Build an [`Error::InvalidEmbedding`].
    pub fn invalid_embedding(message: impl Into<String>) -> Self {
        Self::InvalidEmbedding {
            message: message.into(),
        }
    }

    /// Build an [`Error::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error should fall through to a fallback provider
    /// rather than being surfaced immediately.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
