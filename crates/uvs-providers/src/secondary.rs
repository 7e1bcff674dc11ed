//! The secondary provider: a lightweight, embedded vector store used for
//! failover reads and as a mirror destination for fan-out writes.
//!
//! Stores rows in a single concurrent map with no pool, no transaction
//! semantics, and a min-heap top-k scan for similarity queries — simpler
//! and cheaper than the primary provider's indexed heap, in exchange for
//! being best-effort rather than authoritative.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU8, Ordering};
use uuid::Uuid;
use uvs_domain::error::{Error, Result};
use uvs_domain::ports::provider_port::{ProviderHit, ProviderPort};
use uvs_domain::value_objects::{
    cosine_similarity_unit, matches_filters, Embedding, Filters, Memory, ProviderHealth,
    ProviderState,
};

fn state_to_u8(s: ProviderState) -> u8 {
    match s {
        ProviderState::Uninitialized => 0,
        ProviderState::Initializing => 1,
        ProviderState::Ready => 2,
        ProviderState::Degraded => 3,
        ProviderState::Shutdown => 4,
    }
}

fn u8_to_state(v: u8) -> ProviderState {
    match v {
        0 => ProviderState::Uninitialized,
        1 => ProviderState::Initializing,
        2 => ProviderState::Ready,
        3 => ProviderState::Degraded,
        _ => ProviderState::Shutdown,
    }
}

struct ScoredItem {
    score: f64,
    id: Uuid,
}

impl PartialEq for ScoredItem {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for ScoredItem {}
impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed so `BinaryHeap` (a max-heap) behaves as a min-heap,
        // letting the lowest-scored candidate surface first for eviction.
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(CmpOrdering::Equal)
    }
}

/// An embedded, best-effort secondary provider.
pub struct SecondaryProvider {
    name: String,
    dimension: usize,
    state: AtomicU8,
    rows: DashMap<Uuid, Memory>,
}

impl SecondaryProvider {
    /// Construct a provider in the `Uninitialized` state.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            state: AtomicU8::new(state_to_u8(ProviderState::Uninitialized)),
            rows: DashMap::new(),
        }
    }

    /// Declared dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn set_state(&self, s: ProviderState) {
        self.state.store(state_to_u8(s), Ordering::SeqCst);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProviderState {
        u8_to_state(self.state.load(Ordering::SeqCst))
    }

    /// Mark the provider ready. Embedded stores need no external handshake.
    pub async fn initialize(&self) -> Result<()> {
        self.set_state(ProviderState::Ready);
        Ok(())
    }

    /// Row count, used by mirror-reconciliation divergence checks against
    /// the primary provider.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn ensure_usable(&self) -> Result<()> {
        if !self.state().is_usable() {
            return Err(Error::unavailable(
                &self.name,
                format!("provider is {:?}", self.state()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderPort for SecondaryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn store(
        &self,
        content: &str,
        embedding: &Embedding,
        metadata: HashMap<String, Value>,
    ) -> Result<Uuid> {
        self.ensure_usable()?;
        embedding
            .validate(self.dimension)
            .map_err(Error::invalid_embedding)?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let memory = Memory {
            id,
            content: content.to_string(),
            embedding: embedding.clone(),
            metadata,
            importance_score: 0.5,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        };
        self.rows.insert(id, memory);
        Ok(id)
    }

    async fn query(
        &self,
        embedding: Option<&[f32]>,
        limit: usize,
        min_similarity: f64,
        filters: &Filters,
    ) -> Result<Vec<ProviderHit>> {
        self.ensure_usable()?;
        let Some(embedding) = embedding else {
            let recent = self.get_recent(limit, filters).await?;
            return Ok(recent
                .into_iter()
                .map(|memory| ProviderHit { memory, score: 1.0 })
                .collect());
        };

        let mut heap: BinaryHeap<ScoredItem> = BinaryHeap::with_capacity(limit + 1);
        for entry in self.rows.iter() {
            let memory = entry.value();
            if !matches_filters(&memory.metadata, filters) {
                continue;
            }
            let score = cosine_similarity_unit(embedding, &memory.embedding.vector) as f64;
            if score < min_similarity {
                continue;
            }
            if heap.len() < limit {
                heap.push(ScoredItem { score, id: memory.id });
            } else if let Some(worst) = heap.peek() {
                if score > worst.score {
                    heap.pop();
                    heap.push(ScoredItem { score, id: memory.id });
                }
            }
        }

        let mut hits: Vec<ProviderHit> = heap
            .into_sorted_vec()
            .into_iter()
            .rev()
            .filter_map(|item| {
                self.rows.get(&item.id).map(|m| ProviderHit {
                    memory: m.clone(),
                    score: item.score,
                })
            })
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_recent(&self, limit: usize, filters: &Filters) -> Result<Vec<Memory>> {
        self.ensure_usable()?;
        let mut memories: Vec<Memory> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|m| matches_filters(&m.metadata, filters))
            .collect();
        memories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        memories.truncate(limit);
        Ok(memories)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Memory>> {
        self.ensure_usable()?;
        Ok(self.rows.get(&id).map(|e| e.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.ensure_usable()?;
        Ok(self.rows.remove(&id).is_some())
    }

    async fn update_importance(&self, id: Uuid, new_score: f64) -> Result<()> {
        self.ensure_usable()?;
        if !(0.0..=1.0).contains(&new_score) {
            return Err(Error::out_of_range(format!(
                "importance score {new_score} outside [0, 1]"
            )));
        }
        match self.rows.get_mut(&id) {
            Some(mut entry) => {
                entry.value_mut().importance_score = new_score;
                Ok(())
            }
            None => Err(Error::not_found(format!("memory {id}"))),
        }
    }

    async fn health(&self) -> ProviderHealth {
        let mut detail = HashMap::new();
        detail.insert("row_count".to_string(), serde_json::json!(self.rows.len()));
        ProviderHealth {
            status: self.state(),
            detail,
        }
    }

    async fn stats(&self) -> HashMap<String, Value> {
        let mut stats = HashMap::new();
        stats.insert("row_count".to_string(), serde_json::json!(self.rows.len()));
        stats.insert("state".to_string(), serde_json::json!(self.state()));
        stats
    }

    async fn mirror_store(&self, memory: &Memory) -> Result<()> {
        self.mirror_insert(memory.clone());
        Ok(())
    }

    async fn mirror_remove(&self, id: Uuid) -> Result<()> {
        self.mirror_delete(id);
        Ok(())
    }
}

impl SecondaryProvider {
    /// Insert a row with an id already assigned elsewhere (used by the
    /// coordinator's mirror fan-out, so a memory looked up by id agrees
    /// across providers instead of minting a second identity).
    pub fn mirror_insert(&self, memory: Memory) {
        self.rows.insert(memory.id, memory);
    }

    /// Remove a mirrored row by id, mirroring a primary delete.
    pub fn mirror_delete(&self, id: Uuid) {
        self.rows.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_embedding(dim: usize, seed: f32) -> Embedding {
        Embedding {
            vector: (0..dim).map(|i| seed + i as f32).collect(),
            model: "test".to_string(),
        }
    }

    async fn ready_provider(dim: usize) -> SecondaryProvider {
        let provider = SecondaryProvider::new("secondary", dim);
        provider.initialize().await.unwrap();
        provider
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let provider = ready_provider(4).await;
        let id = provider
            .store("hello", &test_embedding(4, 0.1), HashMap::new())
            .await
            .unwrap();
        let fetched = provider.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello");
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_descending() {
        let provider = ready_provider(4).await;
        provider
            .store("far", &test_embedding(4, 10.0), HashMap::new())
            .await
            .unwrap();
        let near_id = provider
            .store("near", &test_embedding(4, 0.0), HashMap::new())
            .await
            .unwrap();
        let query = test_embedding(4, 0.0);
        let hits = provider
            .query(Some(&query.vector), 1, 0.0, &Filters::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.id, near_id);
    }

    #[tokio::test]
    async fn mirror_insert_preserves_id() {
        let provider = ready_provider(4).await;
        let id = Uuid::new_v4();
        let now = Utc::now();
        provider.mirror_insert(Memory {
            id,
            content: "mirrored".to_string(),
            embedding: test_embedding(4, 0.0),
            metadata: HashMap::new(),
            importance_score: 0.5,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        });
        assert_eq!(provider.get_by_id(id).await.unwrap().unwrap().id, id);
    }

    #[tokio::test]
    async fn unusable_before_initialize() {
        let provider = SecondaryProvider::new("secondary", 4);
        let err = provider
            .store("a", &test_embedding(4, 0.0), HashMap::new())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
