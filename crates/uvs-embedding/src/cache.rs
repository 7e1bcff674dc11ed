//! Bounded LRU+TTL cache keyed by (normalized text, model id) → vector.
//!
//! Built on `moka`, a cache crate well-suited for a high-throughput
//! in-memory provider cache.

use moka::future::Cache;
use std::time::Duration;
use uvs_domain::value_objects::Embedding;

/// Cache key: normalized text paired with the model id that would produce
/// the embedding, so switching models never serves a stale vector.
fn cache_key(normalized_text: &str, model_id: &str) -> String {
    format!("{model_id}\u{1}{normalized_text}")
}

/// The embedding cache. Cloning shares the underlying `moka::future::Cache`.
#[derive(Clone)]
pub struct EmbeddingCache {
    inner: Cache<String, Embedding>,
}

impl EmbeddingCache {
    /// Build a cache with the given entry capacity and time-to-live.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    /// Look up a cached embedding for `(normalized_text, model_id)`.
    pub async fn get(&self, normalized_text: &str, model_id: &str) -> Option<Embedding> {
        self.inner.get(&cache_key(normalized_text, model_id)).await
    }

    /// Insert a freshly computed embedding.
    pub async fn insert(&self, normalized_text: &str, model_id: &str, embedding: Embedding) {
        self.inner
            .insert(cache_key(normalized_text, model_id), embedding)
            .await;
    }

    /// Number of entries currently tracked (approximate; moka is eventually
    /// consistent about pending evictions).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Run pending eviction/TTL sweeps immediately. Used by the periodic
    /// maintenance cache-eviction task.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_returns_exact_vector_from_prior_miss() {
        let cache = EmbeddingCache::new(100, Duration::from_secs(60));
        assert!(cache.get("hello", "m1").await.is_none());
        let embedding = Embedding {
            vector: vec![0.1, 0.2, 0.3],
            model: "m1".to_string(),
        };
        cache.insert("hello", "m1", embedding.clone()).await;
        let hit = cache.get("hello", "m1").await.expect("should hit");
        assert_eq!(hit, embedding);
    }

    #[tokio::test]
    async fn different_model_id_is_a_separate_entry() {
        let cache = EmbeddingCache::new(100, Duration::from_secs(60));
        cache
            .insert(
                "hello",
                "m1",
                Embedding {
                    vector: vec![1.0],
                    model: "m1".to_string(),
                },
            )
            .await;
        assert!(cache.get("hello", "m2").await.is_none());
    }
}
