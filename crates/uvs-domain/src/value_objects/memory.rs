//! The `Memory` entity and its content fingerprint.

use crate::value_objects::embedding::Embedding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One stored unit of content with its embedding and metadata.
///
/// Invariants enforced elsewhere:
/// - `id` is assigned once at creation and never reused.
/// - `embedding.vector.len()` equals the owning store's declared dimension.
/// - `embedding.vector` contains no `NaN`/`±Inf` (checked by the embedding
///   pipeline and again by the primary provider before commit).
/// - `content` is non-empty after normalization and within the configured
///   size bound.
/// - `importance_score` stays in `[0, 1]` across every mutation.
/// - `created_at <= last_accessed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    /// Globally unique, immutable identifier.
    pub id: Uuid,
    /// Normalized UTF-8 content.
    pub content: String,
    /// Fixed-dimension embedding of `content`.
    pub embedding: Embedding,
    /// Free-form metadata (JSON scalars/arrays/objects as values).
    pub metadata: HashMap<String, Value>,
    /// Scalar importance weight in `[0, 1]`.
    pub importance_score: f64,
    /// Creation timestamp (UTC).
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent access (UTC).
    pub last_accessed: DateTime<Utc>,
    /// Number of times this memory has been read.
    pub access_count: u64,
}

impl Memory {
    /// Attach or overwrite a single metadata key with a JSON value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Record an access: bumps `access_count` and `last_accessed`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        if at > self.last_accessed {
            self.last_accessed = at;
        }
    }
}

/// Deterministic 256-bit digest of a memory's normalized content, 1:1 with
/// the memory row it fingerprints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Compute the digest of already-normalized content.
    pub fn of(normalized_content: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(normalized_content.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Lowercase hex representation, convenient as a hash-index key.
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
