//! The primary provider: a durable, transactional, single-heap vector
//! store.
//!
//! Partitioning this table by time would force the similarity index to
//! degrade into per-partition scans, silently dropping cross-partition
//! matches. The authoritative table here is instead a single in-process
//! heap guarded by one write lock, with one similarity index (brute-force
//! cosine over the heap — a production deployment would swap in an
//! HNSW-class engine at this seam) plus supporting ordered indices on
//! `created_at` and `importance_score` and an inverted index on metadata.

use crate::pool::ConnectionPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ordered_float::OrderedFloat;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
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

/// The authoritative heap plus its supporting indices, mutated atomically
/// under a single write lock so a committed write is immediately visible
/// to any subsequent read on this instance.
struct Heap {
    rows: HashMap<Uuid, Memory>,
    by_created_at: BTreeMap<(DateTime<Utc>, Uuid), ()>,
    by_importance: BTreeMap<(OrderedFloat<f64>, Uuid), ()>,
    by_metadata: HashMap<String, HashMap<String, HashSet<Uuid>>>,
}

impl Heap {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
            by_created_at: BTreeMap::new(),
            by_importance: BTreeMap::new(),
            by_metadata: HashMap::new(),
        }
    }

    fn index_metadata(&mut self, id: Uuid, metadata: &HashMap<String, Value>) {
        for (k, v) in metadata {
            self.by_metadata
                .entry(k.clone())
                .or_default()
                .entry(v.to_string())
                .or_default()
                .insert(id);
        }
    }

    fn unindex_metadata(&mut self, id: Uuid, metadata: &HashMap<String, Value>) {
        for (k, v) in metadata {
            if let Some(values) = self.by_metadata.get_mut(k) {
                if let Some(ids) = values.get_mut(&v.to_string()) {
                    ids.remove(&id);
                }
            }
        }
    }

    fn insert(&mut self, memory: Memory) {
        let id = memory.id;
        self.by_created_at.insert((memory.created_at, id), ());
        self.by_importance
            .insert((OrderedFloat(memory.importance_score), id), ());
        self.index_metadata(id, &memory.metadata);
        self.rows.insert(id, memory);
    }

    fn remove(&mut self, id: Uuid) -> Option<Memory> {
        let memory = self.rows.remove(&id)?;
        self.by_created_at.remove(&(memory.created_at, id));
        self.by_importance
            .remove(&(OrderedFloat(memory.importance_score), id));
        self.unindex_metadata(id, &memory.metadata);
        Some(memory)
    }

    fn update_importance(&mut self, id: Uuid, new_score: f64) -> bool {
        let Some(memory) = self.rows.get_mut(&id) else {
            return false;
        };
        let old_score = memory.importance_score;
        memory.importance_score = new_score;
        self.by_importance.remove(&(OrderedFloat(old_score), id));
        self.by_importance.insert((OrderedFloat(new_score), id), ());
        true
    }
}

/// Configuration for [`PrimaryProvider::new`].
#[derive(Debug, Clone)]
pub struct PrimaryProviderConfig {
    /// Provider name, used in `trust.providers_used`/`providers_failed`.
    pub name: String,
    /// Global embedding dimension (must agree with all other providers).
    pub dimension: usize,
    /// Connection pool size.
    pub pool_size: usize,
    /// Pool acquisition timeout.
    pub pool_acquire_timeout: Duration,
    /// Consecutive health-check failures before `Ready` → `Degraded`.
    pub degrade_after_failures: u32,
}

impl Default for PrimaryProviderConfig {
    fn default() -> Self {
        Self {
            name: "primary".to_string(),
            dimension: uvs_domain::constants::DEFAULT_EMBEDDING_DIM,
            pool_size: 10,
            pool_acquire_timeout: Duration::from_millis(
                uvs_domain::constants::DEFAULT_POOL_ACQUIRE_TIMEOUT_MS,
            ),
            degrade_after_failures: uvs_domain::constants::DEFAULT_DEGRADE_AFTER_FAILURES,
        }
    }
}

/// The primary, authoritative provider.
pub struct PrimaryProvider {
    name: String,
    dimension: usize,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    degrade_after_failures: u32,
    pool: ConnectionPool,
    heap: RwLock<Heap>,
    /// Access bookkeeping accumulated between maintenance flush passes —
    /// batched increments to access_count/last_accessed — rather than
    /// mutating the heap synchronously on every read.
    pending_access: DashMap<Uuid, (u64, DateTime<Utc>)>,
}

impl PrimaryProvider {
    /// Construct a provider in the `Uninitialized` state. Callers must
    /// await [`PrimaryProvider::initialize`] before the coordinator may
    /// advertise it as enabled.
    pub fn new(config: PrimaryProviderConfig) -> Self {
        Self {
            name: config.name,
            dimension: config.dimension,
            state: AtomicU8::new(state_to_u8(ProviderState::Uninitialized)),
            consecutive_failures: AtomicU32::new(0),
            degrade_after_failures: config.degrade_after_failures.max(1),
            pool: ConnectionPool::new(config.pool_size, config.pool_acquire_timeout),
            heap: RwLock::new(Heap::new()),
            pending_access: DashMap::new(),
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

    /// Synchronous (from the caller's viewpoint) readiness handshake: open
    /// the pool, verify the table/indices, refresh statistics. No
    /// fire-and-forget: the coordinator awaits this before marking the
    /// provider `enabled`.
    pub async fn initialize(&self) -> Result<()> {
        self.set_state(ProviderState::Initializing);
        info!(provider = %self.name, "primary provider initializing");
        // Pool warm-up / schema verification would happen here against a
        // real backend; the in-process heap needs no further setup.
        self.set_state(ProviderState::Ready);
        info!(provider = %self.name, "primary provider ready");
        Ok(())
    }

    /// Graceful shutdown.
    pub async fn shutdown(&self) {
        self.set_state(ProviderState::Shutdown);
        info!(provider = %self.name, "primary provider shut down");
    }

    /// Record a health check result, transitioning `Ready` → `Degraded`
    /// after `degrade_after_failures` consecutive failures, and any
    /// success returning the provider to `Ready`.
    pub fn record_health_result(&self, success: bool) {
        if success {
            self.consecutive_failures.store(0, Ordering::SeqCst);
            if self.state() == ProviderState::Degraded {
                self.set_state(ProviderState::Ready);
                info!(provider = %self.name, "primary provider recovered to Ready");
            }
        } else {
            let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
            if failures >= self.degrade_after_failures && self.state() == ProviderState::Ready {
                self.set_state(ProviderState::Degraded);
                warn!(provider = %self.name, failures, "primary provider degraded");
            }
        }
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

    /// Apply bounded multiplicative decay toward `floor` to every
    /// importance score, never pushing a score below the floor.
    pub async fn decay_importance_scores(&self, rate: f64, floor: f64) -> usize {
        let mut heap = self.heap.write().await;
        let ids: Vec<Uuid> = heap.rows.keys().copied().collect();
        let mut touched = 0;
        for id in ids {
            let current = heap.rows.get(&id).map(|m| m.importance_score);
            if let Some(current) = current {
                let decayed = (current * (1.0 - rate)).max(floor).min(1.0);
                if (decayed - current).abs() > f64::EPSILON {
                    heap.update_importance(id, decayed);
                    touched += 1;
                }
            }
        }
        touched
    }

    /// Flush pending access bookkeeping into the heap.
    pub async fn flush_access_bookkeeping(&self) -> usize {
        let mut flushed = 0;
        let pending: Vec<(Uuid, (u64, DateTime<Utc>))> = self
            .pending_access
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        self.pending_access.clear();
        if pending.is_empty() {
            return 0;
        }
        let mut heap = self.heap.write().await;
        for (id, (count, at)) in pending {
            if let Some(memory) = heap.rows.get_mut(&id) {
                memory.access_count = memory.access_count.saturating_add(count);
                if at > memory.last_accessed {
                    memory.last_accessed = at;
                }
                flushed += 1;
            }
        }
        flushed
    }

    /// Record an access for later batched bookkeeping flush, without
    /// touching the heap synchronously.
    pub fn note_access(&self, id: Uuid, at: DateTime<Utc>) {
        self.pending_access
            .entry(id)
            .and_modify(|(count, last)| {
                *count += 1;
                if at > *last {
                    *last = at;
                }
            })
            .or_insert((1, at));
    }

    /// Paginated listing of `(id, content)` for the hash-backfill
    /// maintenance task, ordered by id for stable pagination.
    pub async fn list_batch(&self, offset: usize, limit: usize) -> Vec<(Uuid, String)> {
        let heap = self.heap.read().await;
        let mut ids: Vec<Uuid> = heap.rows.keys().copied().collect();
        ids.sort();
        ids.into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| heap.rows.get(&id).map(|m| (id, m.content.clone())))
            .collect()
    }

    /// Total row count, for mirror-reconciliation divergence checks.
    pub async fn row_count(&self) -> usize {
        self.heap.read().await.rows.len()
    }
}

#[async_trait]
impl ProviderPort for PrimaryProvider {
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

        let _lease = self.pool.acquire(&self.name).await?;
        // Everything below runs while the lease and the write lock are
        // held, so a cancelled store never leaves a half-written row.

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

        let mut heap = self.heap.write().await;
        heap.insert(memory);
        drop(heap);

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
            // No embedding means recency order, never similarity scoring.
            let recent = self.get_recent(limit, filters).await?;
            return Ok(recent
                .into_iter()
                .map(|memory| ProviderHit { memory, score: 1.0 })
                .collect());
        };

        let heap = self.heap.read().await;
        let mut hits: Vec<ProviderHit> = heap
            .rows
            .values()
            .filter(|m| matches_filters(&m.metadata, filters))
            .map(|m| ProviderHit {
                memory: m.clone(),
                score: cosine_similarity_unit(embedding, &m.embedding.vector) as f64,
            })
            .filter(|hit| hit.score >= min_similarity)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_recent(&self, limit: usize, filters: &Filters) -> Result<Vec<Memory>> {
        self.ensure_usable()?;
        let heap = self.heap.read().await;
        let memories: Vec<Memory> = heap
            .by_created_at
            .iter()
            .rev()
            .filter_map(|((_, id), ())| heap.rows.get(id))
            .filter(|m| matches_filters(&m.metadata, filters))
            .take(limit)
            .cloned()
            .collect();
        Ok(memories)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Memory>> {
        self.ensure_usable()?;
        Ok(self.heap.read().await.rows.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.ensure_usable()?;
        let mut heap = self.heap.write().await;
        Ok(heap.remove(id).is_some())
    }

    async fn update_importance(&self, id: Uuid, new_score: f64) -> Result<()> {
        self.ensure_usable()?;
        if !(0.0..=1.0).contains(&new_score) {
            return Err(Error::out_of_range(format!(
                "importance score {new_score} outside [0, 1]"
            )));
        }
        let mut heap = self.heap.write().await;
        if heap.update_importance(id, new_score) {
            Ok(())
        } else {
            Err(Error::not_found(format!("memory {id}")))
        }
    }

    async fn health(&self) -> ProviderHealth {
        let mut detail = HashMap::new();
        detail.insert(
            "pool_in_use".to_string(),
            serde_json::json!(self.pool.in_use()),
        );
        detail.insert("pool_max".to_string(), serde_json::json!(self.pool.max()));
        detail.insert(
            "consecutive_failures".to_string(),
            serde_json::json!(self.consecutive_failures.load(Ordering::SeqCst)),
        );
        ProviderHealth {
            status: self.state(),
            detail,
        }
    }

    async fn stats(&self) -> HashMap<String, Value> {
        let heap = self.heap.read().await;
        let mut stats = HashMap::new();
        stats.insert("row_count".to_string(), serde_json::json!(heap.rows.len()));
        stats.insert(
            "pool_in_use".to_string(),
            serde_json::json!(self.pool.in_use()),
        );
        stats.insert("state".to_string(), serde_json::json!(self.state()));
        stats
    }

    fn note_access(&self, id: Uuid, at: DateTime<Utc>) {
        PrimaryProvider::note_access(self, id, at);
    }
}
