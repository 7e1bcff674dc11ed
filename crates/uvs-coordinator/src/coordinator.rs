//! The Unified Store coordinator (C6): owns the provider set, the
//! embedding pipeline and the dedup service, and exposes the user-visible
//! operations the excluded HTTP/CLI layers call into.

use crate::config::{UnifiedStoreConfig, WriteFailoverMode};
use crate::graph::{GraphCollaborator, GraphEvent, GraphNotifier};
use crate::mirror::DropOldestQueue;
use crate::registry::{ProviderEntry, ProviderRegistry};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use uvs_dedup::DedupService;
use uvs_domain::constants::{
    MAX_QUERY_LIMIT, METADATA_KEY_DUPLICATE_OF, METADATA_KEY_PENDING_PRIMARY, METADATA_KEY_SOURCE_PROVIDER,
};
use uvs_domain::error::{Error, Result};
use uvs_domain::normalize::normalize;
use uvs_domain::ports::{noop_hook, HookHandle};
use uvs_domain::value_objects::{
    Filters, Memory, ProviderDescriptor, ProviderHealth, QueryType, ScoredMemory, TrustBlock,
};
use uvs_embedding::EmbeddingPipeline;

/// One mirror job queued for best-effort fan-out to a non-primary
/// provider. Applying either variant twice is harmless (both are upserts
/// keyed by id), which is what makes the drain-on-push race in
/// [`UnifiedStoreCoordinator::fan_out_mirror`] safe.
#[derive(Debug, Clone)]
enum MirrorJob {
    Store(Memory),
    Delete(Uuid),
}

/// Everything needed to run [`UnifiedStoreCoordinator::query`]. Bundled
/// into one struct because the operation has more parameters than reads
/// comfortably as a positional argument list (mirrors the HTTP layer's
/// query request shape from spec §6, without adopting its wire format).
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// `None`/empty after normalization selects the empty-query fast path.
    pub query_text: Option<String>,
    /// Maximum number of results.
    pub limit: usize,
    /// Minimum similarity score results must clear.
    pub min_similarity: f64,
    /// Metadata equality filters.
    pub filters: Filters,
    /// Restrict dispatch to these provider names; `None` means all enabled.
    pub providers: Option<Vec<String>>,
    /// When the merged result set is short of `limit`, floor the
    /// similarity threshold at 0 rather than returning fewer results.
    pub relax_similarity_if_incomplete: bool,
}

/// Result of [`UnifiedStoreCoordinator::query`].
#[derive(Debug, Clone)]
pub struct QueryEnvelope {
    /// Ranked, deduplicated-by-id results.
    pub memories: Vec<ScoredMemory>,
    /// `memories.len()` before any caller-side pagination.
    pub total_found: usize,
    /// Wall-clock time the operation took.
    pub query_time_ms: u64,
    /// Which providers contributed and how complete the answer is.
    pub trust: TrustBlock,
}

/// Configuration the coordinator is constructed with, plus the collaborating
/// services it owns.
pub struct UnifiedStoreCoordinator {
    config: UnifiedStoreConfig,
    registry: ProviderRegistry,
    embedding: Arc<EmbeddingPipeline>,
    dedup: Arc<DedupService>,
    graph: Option<GraphNotifier>,
    graph_collaborator: Option<Arc<dyn GraphCollaborator>>,
    hooks: HookHandle,
    mirror_queues: DashMap<String, Arc<DropOldestQueue<MirrorJob>>>,
}

impl UnifiedStoreCoordinator {
    /// Build a coordinator. `registry` should already have had its
    /// providers registered (and their own `initialize()` awaited) before
    /// being handed here — the coordinator never advertises a provider
    /// before the caller has marked it `enabled`.
    pub fn new(
        config: UnifiedStoreConfig,
        registry: ProviderRegistry,
        embedding: Arc<EmbeddingPipeline>,
        dedup: Arc<DedupService>,
    ) -> Result<Self> {
        config.validate()?;
        let graph = config.graph_enabled.then(|| GraphNotifier::new(1024));
        Ok(Self {
            config,
            registry,
            embedding,
            dedup,
            graph,
            graph_collaborator: None,
            hooks: noop_hook(),
            mirror_queues: DashMap::new(),
        })
    }

    /// Attach an instrumentation hook, replacing the default no-op.
    pub fn with_hooks(mut self, hooks: HookHandle) -> Self {
        self.hooks = hooks;
        self
    }

    /// Attach a knowledge-graph collaborator. Its `handle` is only ever
    /// invoked by the spawned mirror/notify tasks, never inline on the
    /// write path.
    pub fn with_graph_collaborator(mut self, collaborator: Arc<dyn GraphCollaborator>) -> Self {
        self.graph_collaborator = Some(collaborator);
        self
    }

    /// Read access to the provider registry, for wiring and for the
    /// maintenance crate's health-polling task.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Read access to the dedup service, for the maintenance crate's hash
    /// backfill task and for admin surfaces.
    pub fn dedup(&self) -> &Arc<DedupService> {
        &self.dedup
    }

    /// Read access to the embedding pipeline, for the maintenance crate's
    /// cache-eviction task.
    pub fn embedding(&self) -> &Arc<EmbeddingPipeline> {
        &self.embedding
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> &UnifiedStoreConfig {
        &self.config
    }

    // ---- store -------------------------------------------------------

    /// `store(content, metadata, importance?) -> Memory`, per spec §4.6.
    #[instrument(skip(self, content, metadata), fields(content_len = content.len()))]
    pub async fn store(
        &self,
        content: &str,
        mut metadata: HashMap<String, Value>,
        importance_score: Option<f64>,
    ) -> Result<Memory> {
        self.hooks.op_started("store");
        let started = Instant::now();
        let result = self.store_inner(content, &mut metadata, importance_score).await;
        self.hooks
            .op_finished("store", started.elapsed(), result.is_ok());
        result
    }

    async fn store_inner(
        &self,
        content: &str,
        metadata: &mut HashMap<String, Value>,
        importance_score: Option<f64>,
    ) -> Result<Memory> {
        let normalized = normalize(content);
        if normalized.is_empty() {
            return Err(Error::invalid_input("content", "empty after normalization"));
        }
        if normalized.len() > self.config.max_content_bytes {
            return Err(Error::invalid_input(
                "content",
                format!(
                    "{} bytes exceeds the {} byte limit",
                    normalized.len(),
                    self.config.max_content_bytes
                ),
            ));
        }
        if let Some(score) = importance_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(Error::out_of_range(format!(
                    "importance_score {score} outside [0, 1]"
                )));
            }
        }

        // Step 2: embed. Any C4 failure (including InvalidEmbedding) is
        // terminal for this call and surfaces as EmbeddingFailed.
        let (embedding, is_pseudo) = self
            .embedding
            .embed(&normalized)
            .await
            .map_err(|e| Error::embedding_failed(e.to_string()))?;
        if is_pseudo {
            metadata.insert(
                uvs_domain::constants::METADATA_KEY_PSEUDO_EMBEDDING.to_string(),
                Value::Bool(true),
            );
        }

        // Step 3: dedup. Failures fail open (write proceeds), per §4.6
        // "Dedup failures default to allowing the write".
        let dedup_outcome = match self
            .dedup
            .check(&normalized, &embedding.vector, metadata)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "dedup check failed, allowing write (fail-open)");
                uvs_domain::value_objects::DedupOutcome::unique()
            }
        };

        if dedup_outcome.is_duplicate {
            let Some(canonical_id) = dedup_outcome.canonical_id else {
                return Err(Error::internal("dedup reported a duplicate with no canonical id"));
            };
            if let Some(canonical) = self.get_from_any_provider(canonical_id).await? {
                info!(%canonical_id, tier = ?dedup_outcome.tier, "store collapsed onto existing memory");
                return Ok(canonical.with_metadata(METADATA_KEY_DUPLICATE_OF, canonical_id.to_string()));
            }
            // Canonical id was recorded but the row is gone (e.g. deleted
            // since); fall through and store the candidate normally.
            warn!(%canonical_id, "dedup canonical id not found in any provider, storing candidate");
        }

        // Step 4: write to primary (or fail-open to a secondary).
        let (id, written_provider, pending_primary) = self
            .write_primary_or_fail_open(&normalized, &embedding, metadata.clone())
            .await?;
        if pending_primary {
            metadata.insert(METADATA_KEY_PENDING_PRIMARY.to_string(), Value::Bool(true));
        }

        if let Some(score) = importance_score {
            if let Some(entry) = self.registry.by_name(&written_provider) {
                if let Err(err) = entry.port.update_importance(id, score).await {
                    warn!(%id, error = %err, "failed to apply requested importance_score after store");
                }
            }
        }

        self.dedup.record_hash(&normalized, id);

        let memory = self
            .get_from_any_provider(id)
            .await?
            .ok_or_else(|| Error::internal("memory vanished immediately after a successful store"))?;

        // Step 5: best-effort mirror fan-out to every other enabled
        // provider (never the one just written to).
        self.fan_out_mirror(MirrorJob::Store(memory.clone()), Some(&written_provider));

        // Step 6: non-blocking hand-off to the graph collaborator.
        if let Some(graph) = &self.graph {
            graph.notify(GraphEvent::Stored(memory.clone()));
            self.spawn_graph_drain(graph);
        }

        Ok(memory)
    }

    async fn write_primary_or_fail_open(
        &self,
        normalized_content: &str,
        embedding: &uvs_domain::value_objects::Embedding,
        metadata: HashMap<String, Value>,
    ) -> Result<(Uuid, String, bool)> {
        let Some(primary) = self.registry.primary() else {
            return Err(Error::unavailable(
                &self.config.primary_provider_name,
                "no primary provider is registered and enabled",
            ));
        };
        let deadline = Duration::from_millis(self.config.store_deadline_ms);
        match timeout(
            deadline,
            primary.port.store(normalized_content, embedding, metadata.clone()),
        )
        .await
        {
            Ok(Ok(id)) => Ok((id, primary.descriptor.name.clone(), false)),
            Ok(Err(err)) if err.is_unavailable() => {
                self.handle_primary_write_failure(normalized_content, embedding, metadata, &primary.descriptor.name)
                    .await
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(Error::deadline_exceeded("store", deadline.as_millis() as u64)),
        }
    }

    async fn handle_primary_write_failure(
        &self,
        normalized_content: &str,
        embedding: &uvs_domain::value_objects::Embedding,
        mut metadata: HashMap<String, Value>,
        primary_name: &str,
    ) -> Result<(Uuid, String, bool)> {
        match self.config.write_failover_mode {
            WriteFailoverMode::FailClosed => {
                Err(Error::unavailable(primary_name, "primary is unavailable (fail-closed)"))
            }
            WriteFailoverMode::FailOpen => {
                metadata.insert(METADATA_KEY_PENDING_PRIMARY.to_string(), Value::Bool(true));
                for secondary in self.registry.secondaries() {
                    match secondary
                        .port
                        .store(normalized_content, embedding, metadata.clone())
                        .await
                    {
                        Ok(id) => {
                            warn!(
                                provider = %secondary.descriptor.name,
                                "primary unavailable, wrote under fail-open policy"
                            );
                            return Ok((id, secondary.descriptor.name.clone(), true));
                        }
                        Err(err) => {
                            warn!(provider = %secondary.descriptor.name, error = %err, "fail-open candidate also failed");
                        }
                    }
                }
                Err(Error::unavailable(
                    primary_name,
                    "primary unavailable and no secondary accepted the fail-open write",
                ))
            }
        }
    }

    // ---- query ---------------------------------------------------------

    /// `query(query_text|null, limit, min_similarity, filters, providers?) ->
    /// {memories, trust}`, per spec §4.6.
    #[instrument(skip(self, request))]
    pub async fn query(&self, mut request: QueryRequest) -> Result<QueryEnvelope> {
        self.hooks.op_started("query");
        let started = Instant::now();

        if request.limit > MAX_QUERY_LIMIT {
            request.limit = MAX_QUERY_LIMIT;
        }
        if !(0.0..=1.0).contains(&request.min_similarity) {
            self.hooks.op_finished("query", started.elapsed(), false);
            return Err(Error::invalid_input("min_similarity", "must be in [0, 1]"));
        }

        // An explicit limit=0 short-circuits before any embedding call or
        // provider dispatch; defaulting an *absent* limit to
        // `DEFAULT_QUERY_LIMIT` is the excluded HTTP layer's job.
        if request.limit == 0 {
            self.hooks.op_finished("query", started.elapsed(), true);
            return Ok(QueryEnvelope {
                memories: Vec::new(),
                total_found: 0,
                query_time_ms: started.elapsed().as_millis() as u64,
                trust: TrustBlock::new(Vec::new(), Vec::new(), 1.0, QueryType::Empty),
            });
        }

        let result = self.query_inner(request, started).await;
        self.hooks
            .op_finished("query", started.elapsed(), result.is_ok());
        result
    }

    async fn query_inner(&self, request: QueryRequest, started: Instant) -> Result<QueryEnvelope> {
        let normalized_query = request.query_text.as_deref().map(normalize).unwrap_or_default();

        if normalized_query.is_empty() {
            return self.query_empty_path(&request, started).await;
        }

        let (embedding, _) = self
            .embedding
            .embed(&normalized_query)
            .await
            .map_err(|e| Error::embedding_failed(e.to_string()))?;

        let candidates = self.resolve_targets(&request.providers);
        let deadline = Duration::from_millis(self.config.query_deadline_ms);
        let limit = request.limit;
        let min_similarity = request.min_similarity;
        let filters = request.filters.clone();

        let mut providers_used = Vec::new();
        let mut providers_failed = Vec::new();
        let mut by_id: HashMap<Uuid, ScoredMemory> = HashMap::new();

        // `enabled` in the registry only reflects registration, not runtime
        // health — health polling flips an internal atomic, never
        // `descriptor.enabled`. A `Degraded` provider (primary included)
        // must not answer a similarity query; exclude it here and record it
        // as failed rather than letting it silently land in `providers_used`.
        let mut targets = Vec::with_capacity(candidates.len());
        for entry in candidates {
            let health = entry.port.health().await;
            if health.status == uvs_domain::value_objects::ProviderState::Ready {
                targets.push(entry);
            } else {
                warn!(
                    provider = %entry.descriptor.name,
                    status = ?health.status,
                    "excluding non-ready provider from similarity dispatch"
                );
                providers_failed.push(entry.descriptor.name.clone());
            }
        }

        let calls = targets.iter().map(|entry| {
            let entry = entry.clone();
            let vector = embedding.vector.clone();
            let filters = filters.clone();
            async move {
                let outcome = timeout(deadline, entry.port.query(Some(&vector), limit, min_similarity, &filters)).await;
                (entry.descriptor.name.clone(), outcome)
            }
        });
        let results = futures::future::join_all(calls).await;

        for (name, outcome) in results {
            match outcome {
                Ok(Ok(hits)) => {
                    providers_used.push(name.clone());
                    for hit in hits {
                        by_id
                            .entry(hit.memory.id)
                            .and_modify(|existing| {
                                if hit.score > existing.score {
                                    existing.score = hit.score;
                                    existing.source_provider = name.clone();
                                }
                            })
                            .or_insert(ScoredMemory {
                                memory: hit.memory,
                                score: hit.score,
                                source_provider: name.clone(),
                            });
                    }
                }
                Ok(Err(err)) => {
                    warn!(provider = %name, error = %err, "provider query failed");
                    providers_failed.push(name);
                }
                Err(_) => {
                    warn!(provider = %name, "provider query timed out");
                    providers_failed.push(name);
                }
            }
        }

        // min_similarity was already pushed down into each provider's query,
        // so a short result set can only be backfilled by re-dispatching
        // with the threshold floored at 0, per the "relax" contract.
        if by_id.len() < request.limit && request.relax_similarity_if_incomplete && min_similarity > 0.0 {
            let relax_calls = targets.iter().map(|entry| {
                let entry = entry.clone();
                let vector = embedding.vector.clone();
                let filters = filters.clone();
                async move {
                    let outcome = timeout(deadline, entry.port.query(Some(&vector), limit, 0.0, &filters)).await;
                    (entry.descriptor.name.clone(), outcome)
                }
            });
            let relax_results = futures::future::join_all(relax_calls).await;
            for (name, outcome) in relax_results {
                if let Ok(Ok(hits)) = outcome {
                    if !providers_used.contains(&name) {
                        providers_used.push(name.clone());
                    }
                    for hit in hits {
                        by_id
                            .entry(hit.memory.id)
                            .and_modify(|existing| {
                                if hit.score > existing.score {
                                    existing.score = hit.score;
                                    existing.source_provider = name.clone();
                                }
                            })
                            .or_insert(ScoredMemory {
                                memory: hit.memory,
                                score: hit.score,
                                source_provider: name.clone(),
                            });
                    }
                }
            }
        }

        let mut memories: Vec<ScoredMemory> = by_id.into_values().collect();
        memories.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
        });
        memories.truncate(request.limit);

        let total_estimate = (providers_used.len() + providers_failed.len()).max(1);
        let trust = TrustBlock::new(
            providers_used,
            providers_failed,
            memories.len() as f64 / total_estimate as f64,
            QueryType::Similarity,
        );

        let total_found = memories.len();
        for scored in &memories {
            if let Some(entry) = self.registry.by_name(&scored.source_provider) {
                entry.port.note_access(scored.memory.id, Utc::now());
            }
        }

        Ok(QueryEnvelope {
            memories,
            total_found,
            query_time_ms: started.elapsed().as_millis() as u64,
            trust,
        })
    }

    /// The empty-query fast path (§4.6 step 1 / §9 "Empty-query
    /// handling"). MUST NOT call the embedding pipeline (P8).
    async fn query_empty_path(&self, request: &QueryRequest, started: Instant) -> Result<QueryEnvelope> {
        let mut providers_used = Vec::new();
        let mut providers_failed = Vec::new();
        let mut memories = Vec::new();

        if let Some(primary) = self.registry.primary() {
            let health = primary.port.health().await;
            if health.status == uvs_domain::value_objects::ProviderState::Ready {
                match primary.port.get_recent(request.limit, &request.filters).await {
                    Ok(recent) => {
                        providers_used.push(primary.descriptor.name.clone());
                        memories = recent
                            .into_iter()
                            .map(|memory| ScoredMemory {
                                memory,
                                score: 1.0,
                                source_provider: primary.descriptor.name.clone(),
                            })
                            .collect();
                    }
                    Err(err) => {
                        warn!(provider = %primary.descriptor.name, error = %err, "primary get_recent failed");
                        providers_failed.push(primary.descriptor.name.clone());
                    }
                }
            } else {
                providers_failed.push(primary.descriptor.name.clone());
            }
        }

        if memories.is_empty() {
            for secondary in self.registry.secondaries() {
                match secondary.port.get_recent(request.limit, &request.filters).await {
                    Ok(recent) if !recent.is_empty() => {
                        providers_used.push(secondary.descriptor.name.clone());
                        memories = recent
                            .into_iter()
                            .map(|memory| ScoredMemory {
                                memory,
                                score: 1.0,
                                source_provider: secondary.descriptor.name.clone(),
                            })
                            .collect();
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(provider = %secondary.descriptor.name, error = %err, "secondary get_recent failed");
                        providers_failed.push(secondary.descriptor.name.clone());
                    }
                }
            }
        }

        let total_estimate = (providers_used.len() + providers_failed.len()).max(1);
        let trust = TrustBlock::new(
            providers_used,
            providers_failed,
            memories.len() as f64 / total_estimate as f64,
            QueryType::Empty,
        );
        let total_found = memories.len();
        Ok(QueryEnvelope {
            memories,
            total_found,
            query_time_ms: started.elapsed().as_millis() as u64,
            trust,
        })
    }

    fn resolve_targets(&self, providers: &Option<Vec<String>>) -> Vec<ProviderEntry> {
        match providers {
            Some(names) => names
                .iter()
                .filter_map(|name| self.registry.by_name(name))
                .collect(),
            None => self.registry.enabled(),
        }
    }

    // ---- point ops -----------------------------------------------------

    /// `get(id)`: primary first; on `NotFound`, probe secondaries.
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Memory>> {
        self.hooks.op_started("get");
        let started = Instant::now();
        let result = self.get_inner(id).await;
        self.hooks.op_finished("get", started.elapsed(), result.is_ok());
        result
    }

    async fn get_inner(&self, id: Uuid) -> Result<Option<Memory>> {
        if let Some(primary) = self.registry.primary() {
            match primary.port.get_by_id(id).await {
                Ok(Some(memory)) => {
                    primary.port.note_access(id, Utc::now());
                    return Ok(Some(memory));
                }
                Ok(None) => {}
                Err(err) => warn!(provider = %primary.descriptor.name, error = %err, "primary get_by_id failed"),
            }
        }
        for secondary in self.registry.secondaries() {
            if let Ok(Some(memory)) = secondary.port.get_by_id(id).await {
                secondary.port.note_access(id, Utc::now());
                return Ok(Some(
                    memory.with_metadata(METADATA_KEY_SOURCE_PROVIDER, secondary.descriptor.name.clone()),
                ));
            }
        }
        Ok(None)
    }

    async fn get_from_any_provider(&self, id: Uuid) -> Result<Option<Memory>> {
        self.get_inner(id).await
    }

    /// `delete(id)`: transactional on primary; best-effort fan-out;
    /// idempotent (P5).
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.hooks.op_started("delete");
        let started = Instant::now();
        let result = self.delete_inner(id).await;
        self.hooks
            .op_finished("delete", started.elapsed(), result.is_ok());
        result
    }

    async fn delete_inner(&self, id: Uuid) -> Result<bool> {
        let Some(primary) = self.registry.primary() else {
            return Err(Error::unavailable(
                &self.config.primary_provider_name,
                "no primary provider is registered and enabled",
            ));
        };
        let existed = primary.port.delete(id).await?;
        if !existed {
            return Ok(false);
        }

        self.dedup.remove_hash(id);
        self.fan_out_mirror(MirrorJob::Delete(id), Some(&primary.descriptor.name));
        if let Some(graph) = &self.graph {
            graph.notify(GraphEvent::Deleted(id));
            self.spawn_graph_drain(graph);
        }
        Ok(true)
    }

    /// `update_importance(id, new_score)`: primary-only; mirrored lazily
    /// by C7, not synchronously here.
    #[instrument(skip(self))]
    pub async fn update_importance(&self, id: Uuid, new_score: f64) -> Result<()> {
        self.hooks.op_started("update_importance");
        let started = Instant::now();
        let result = self.update_importance_inner(id, new_score).await;
        self.hooks
            .op_finished("update_importance", started.elapsed(), result.is_ok());
        result
    }

    async fn update_importance_inner(&self, id: Uuid, new_score: f64) -> Result<()> {
        let Some(primary) = self.registry.primary() else {
            return Err(Error::unavailable(
                &self.config.primary_provider_name,
                "no primary provider is registered and enabled",
            ));
        };
        primary.port.update_importance(id, new_score).await
    }

    // ---- admin ops -----------------------------------------------------

    /// Admin op: `set_dedup_mode`.
    pub fn set_dedup_mode(&self, mode: uvs_domain::value_objects::DedupMode) {
        self.dedup.set_mode(mode);
    }

    /// Admin op: `mark_false_positive`.
    pub async fn mark_false_positive(&self, reported_id: Uuid, actual_id: Uuid) {
        self.dedup.mark_false_positive(reported_id, actual_id).await;
    }

    /// Admin op: `provider_health`.
    pub async fn provider_health(&self) -> HashMap<String, ProviderHealth> {
        let mut out = HashMap::new();
        for entry in self.registry.all().iter() {
            out.insert(entry.descriptor.name.clone(), entry.port.health().await);
        }
        out
    }

    /// Admin op: `live_stats`.
    pub async fn live_stats(&self) -> HashMap<String, HashMap<String, Value>> {
        let mut out = HashMap::new();
        for entry in self.registry.all().iter() {
            out.insert(entry.descriptor.name.clone(), entry.port.stats().await);
        }
        out
    }

    /// Register a provider and mark it enabled, the last step of a
    /// readiness handshake the caller already awaited.
    pub fn register_provider(&self, descriptor: ProviderDescriptor, port: Arc<dyn uvs_domain::ports::ProviderPort>) -> Result<()> {
        self.registry.register(ProviderEntry { descriptor, port })
    }

    // ---- mirror fan-out --------------------------------------------------

    fn fan_out_mirror(&self, job: MirrorJob, skip_provider: Option<&str>) {
        for target in self.registry.mirror_targets() {
            if skip_provider == Some(target.descriptor.name.as_str()) {
                continue;
            }
            let queue = self
                .mirror_queues
                .entry(target.descriptor.name.clone())
                .or_insert_with(|| Arc::new(DropOldestQueue::new(uvs_domain::constants::DEFAULT_MIRROR_QUEUE_CAPACITY)))
                .clone();
            queue.push(job.clone());
            let port = target.port.clone();
            let name = target.descriptor.name.clone();
            let hooks = self.hooks.clone();
            tokio::spawn(async move {
                for pending in queue.drain() {
                    let outcome = match pending {
                        MirrorJob::Store(memory) => port.mirror_store(&memory).await,
                        MirrorJob::Delete(id) => port.mirror_remove(id).await,
                    };
                    let success = outcome.is_ok();
                    if let Err(err) = outcome {
                        warn!(provider = %name, error = %err, "mirror fan-out failed, dropped");
                    }
                    hooks.provider_call(&name, "mirror", success);
                }
            });
        }
    }

    fn spawn_graph_drain(&self, graph: &GraphNotifier) {
        let Some(collaborator) = self.graph_collaborator.clone() else {
            return;
        };
        let queue = graph.queue();
        tokio::spawn(async move {
            for event in queue.drain() {
                collaborator.handle(event).await;
            }
        });
    }
}
