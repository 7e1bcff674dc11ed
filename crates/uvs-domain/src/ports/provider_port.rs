//! The uniform provider contract every backend implements.

use crate::error::Result;
use crate::value_objects::{Embedding, Filters, Memory, ProviderHealth};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One scored hit from `ProviderPort::query`/`get_recent`.
#[derive(Debug, Clone)]
pub struct ProviderHit {
    /// The stored memory.
    pub memory: Memory,
    /// Cosine-based similarity in `[0, 1]`. Providers unable to compute a
    /// similarity (e.g. recency-only results) return `1.0`.
    pub score: f64,
}

/// Uniform contract all backends implement: store/query/get/delete/
/// update-importance/health/recent/stats. All operations are
/// asynchronous, may suspend on I/O, and must be safe to call concurrently
/// from arbitrary callers.
#[async_trait]
pub trait ProviderPort: Send + Sync {
    /// Stable identifier for this provider instance (e.g. "primary-pg",
    /// "secondary-edge").
    fn name(&self) -> &str;

    /// Store new content with its embedding and metadata, returning the
    /// newly assigned id.
    async fn store(
        &self,
        content: &str,
        embedding: &Embedding,
        metadata: HashMap<String, Value>,
    ) -> Result<Uuid>;

    /// Similarity query. `embedding = None` MUST be serviced by delegating
    /// to [`ProviderPort::get_recent`] — this is the empty-query fast path
    /// that must never touch the embedding pipeline.
    async fn query(
        &self,
        embedding: Option<&[f32]>,
        limit: usize,
        min_similarity: f64,
        filters: &Filters,
    ) -> Result<Vec<ProviderHit>>;

    /// Most recent memories, newest first, bypassing similarity scoring
    /// entirely.
    async fn get_recent(&self, limit: usize, filters: &Filters) -> Result<Vec<Memory>>;

    /// Fetch a single memory by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Memory>>;

    /// Delete a memory by id. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Update a memory's importance score in place.
    async fn update_importance(&self, id: Uuid, new_score: f64) -> Result<()>;

    /// Current health/lifecycle state.
    async fn health(&self) -> ProviderHealth;

    /// Provider-specific counters (row count, index size, ...). Never
    /// fails; returns an empty map if nothing is available.
    async fn stats(&self) -> HashMap<String, Value>;

    /// Accept a fully-formed memory as a best-effort mirror target,
    /// preserving its id so cross-provider lookups (e.g. the coordinator's
    /// `get` fallback) agree on identity. The default rejects mirroring;
    /// providers that support it (the secondary provider) override this.
    async fn mirror_store(&self, _memory: &Memory) -> Result<()> {
        Err(crate::error::Error::unavailable(
            self.name(),
            "mirroring not supported by this provider",
        ))
    }

    /// Remove a mirrored row by id, mirroring a primary delete. Default
    /// rejects, same rationale as [`ProviderPort::mirror_store`].
    async fn mirror_remove(&self, _id: Uuid) -> Result<()> {
        Err(crate::error::Error::unavailable(
            self.name(),
            "mirroring not supported by this provider",
        ))
    }

    /// Record a read hit against `id` for access-count/last-accessed
    /// bookkeeping. Non-blocking and best-effort: the default is a no-op,
    /// since not every backend tracks access statistics.
    fn note_access(&self, _id: Uuid, _at: chrono::DateTime<chrono::Utc>) {}
}
