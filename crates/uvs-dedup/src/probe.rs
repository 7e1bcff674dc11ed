//! Minimal seam the vector tier probes through.
//!
//! Kept separate from `uvs_domain::ports::ProviderPort` so this crate does
//! not need to depend on `uvs-providers`; the coordinator crate adapts a
//! `ProviderPort` into a `VectorProbe`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One hit returned by a similarity probe against the primary provider.
#[derive(Debug, Clone)]
pub struct ProbeHit {
    /// Id of the existing memory.
    pub id: Uuid,
    /// Its content (used by rule-tier predicates).
    pub content: String,
    /// Its metadata (used by rule-tier predicates).
    pub metadata: HashMap<String, Value>,
    /// Its creation time (used by rule-tier predicates).
    pub created_at: DateTime<Utc>,
    /// Cosine-based similarity in `[0, 1]`.
    pub score: f64,
}

/// Vector-tier probe: "query the primary provider with the candidate's
/// embedding, limit=K, min_similarity=T_sim".
#[async_trait]
pub trait VectorProbe: Send + Sync {
    /// Return up to `limit` existing memories at or above `min_similarity`,
    /// ranked by descending similarity.
    async fn similar(
        &self,
        embedding: &[f32],
        limit: usize,
        min_similarity: f64,
    ) -> uvs_domain::error::Result<Vec<ProbeHit>>;
}
