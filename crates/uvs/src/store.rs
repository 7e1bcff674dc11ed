//! Top-level facade wiring every crate together into one embeddable store,
//! the analogue of the teacher's `mcb-server` `builder.rs`/`init.rs` minus
//! the HTTP/MCP transport layers those files also bootstrap (no process
//! surface is in scope here — see the workspace's stated non-goals).

use std::sync::Arc;
use std::time::Duration;

use uvs_coordinator::{ProviderEntry, ProviderRegistry, UnifiedStoreConfig, UnifiedStoreCoordinator};
use uvs_dedup::{DedupService, DedupServiceConfig};
use uvs_domain::error::Result;
use uvs_domain::ports::{EmbeddingModel, HookHandle};
use uvs_domain::value_objects::{DedupMode, ProviderDescriptor, ProviderHealth, ProviderRole};
use uvs_embedding::{EmbeddingPipeline, EmbeddingPipelineConfig};
use uvs_maintenance::{MaintenanceHandle, MaintenanceIntervals};
use uvs_providers::{PrimaryProvider, PrimaryProviderConfig, SecondaryProvider};

use crate::config::StoreSettings;

/// Builds a [`UnifiedVectorStore`] from [`StoreSettings`] plus the one
/// thing settings can't describe: the embedding model chain, which is a
/// live trait object (an HTTP client, a local model, a test double) rather
/// than configuration data.
pub struct UnifiedVectorStoreBuilder {
    settings: StoreSettings,
    embedding_chain: Vec<Arc<dyn EmbeddingModel>>,
    hooks: Option<HookHandle>,
    graph_collaborator: Option<Arc<dyn uvs_coordinator::GraphCollaborator>>,
    start_maintenance: bool,
}

impl UnifiedVectorStoreBuilder {
    /// Start a builder from already-loaded settings and an embedding model
    /// chain, tried in declared order by the pipeline.
    pub fn new(settings: StoreSettings, embedding_chain: Vec<Arc<dyn EmbeddingModel>>) -> Self {
        Self {
            settings,
            embedding_chain,
            hooks: None,
            graph_collaborator: None,
            start_maintenance: true,
        }
    }

    /// Attach an instrumentation hook in place of the default no-op.
    pub fn with_hooks(mut self, hooks: HookHandle) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Attach a knowledge-graph collaborator notified on writes/deletes.
    pub fn with_graph_collaborator(mut self, collaborator: Arc<dyn uvs_coordinator::GraphCollaborator>) -> Self {
        self.graph_collaborator = Some(collaborator);
        self
    }

    /// Skip spawning the background maintenance scheduler, for tests and
    /// short-lived embedders that drive decay/flush/resync manually.
    pub fn without_maintenance(mut self) -> Self {
        self.start_maintenance = false;
        self
    }

    /// Construct every provider, the embedding pipeline, the dedup
    /// service, the coordinator and (unless disabled) the maintenance
    /// scheduler, returning the assembled store.
    pub async fn build(self) -> Result<UnifiedVectorStore> {
        let coordinator_config = self.settings.coordinator.clone();
        let dim = coordinator_config.embedding_dim;

        let registry = ProviderRegistry::new();

        let primary = Arc::new(PrimaryProvider::new(PrimaryProviderConfig {
            name: coordinator_config.primary_provider_name.clone(),
            dimension: dim,
            pool_size: self.settings.pool.size,
            pool_acquire_timeout: Duration::from_millis(self.settings.pool.acquire_timeout_ms),
            degrade_after_failures: coordinator_config.degrade_after_failures,
        }));
        primary.initialize().await?;
        registry.register(ProviderEntry {
            descriptor: ProviderDescriptor {
                name: coordinator_config.primary_provider_name.clone(),
                role: ProviderRole::Primary,
                enabled: true,
                dimension: dim,
            },
            port: primary.clone(),
        })?;

        let mut secondaries = Vec::with_capacity(self.settings.secondary_provider_names.len());
        for name in &self.settings.secondary_provider_names {
            let secondary = Arc::new(SecondaryProvider::new(name.clone(), dim));
            secondary.initialize().await?;
            registry.register(ProviderEntry {
                descriptor: ProviderDescriptor {
                    name: name.clone(),
                    role: ProviderRole::Secondary,
                    enabled: true,
                    dimension: dim,
                },
                port: secondary.clone(),
            })?;
            secondaries.push(secondary);
        }

        let embedding = Arc::new(EmbeddingPipeline::new(
            self.embedding_chain,
            EmbeddingPipelineConfig {
                dimension: dim,
                cache_size: coordinator_config.embedding_cache_size,
                cache_ttl: Duration::from_secs(coordinator_config.embedding_cache_ttl),
            },
        ));

        let probe = Arc::new(uvs_coordinator::PrimaryVectorProbe::new(registry.clone()));
        let dedup = Arc::new(DedupService::new(
            probe,
            DedupServiceConfig {
                mode: coordinator_config.dedup_mode,
                exact_match_only: coordinator_config.dedup_exact_match_only,
                similarity_threshold_active: coordinator_config.dedup_similarity_threshold,
                ..Default::default()
            },
        ));

        let mut coordinator = UnifiedStoreCoordinator::new(coordinator_config, registry, embedding, dedup.clone())?;
        if let Some(hooks) = self.hooks {
            coordinator = coordinator.with_hooks(hooks);
        }
        if let Some(collaborator) = self.graph_collaborator {
            coordinator = coordinator.with_graph_collaborator(collaborator);
        }
        let coordinator = Arc::new(coordinator);

        let maintenance = if self.start_maintenance {
            let intervals = MaintenanceIntervals {
                decay: Duration::from_secs(self.settings.maintenance.decay_interval_secs),
                access_flush: Duration::from_secs(self.settings.maintenance.access_flush_interval_secs),
                cache_eviction: Duration::from_secs(self.settings.maintenance.cache_eviction_interval_secs),
                health_poll: Duration::from_secs(self.settings.maintenance.health_poll_interval_secs),
                mirror_resync: Duration::from_secs(self.settings.maintenance.mirror_resync_interval_secs),
                batch_size: self.settings.maintenance.batch_size,
            };
            Some(Arc::new(uvs_maintenance::spawn_all(
                coordinator.clone(),
                primary.clone(),
                secondaries.clone(),
                self.settings.coordinator_importance_decay_rate(),
                self.settings.coordinator_importance_floor(),
                intervals,
            )))
        } else {
            None
        };

        Ok(UnifiedVectorStore {
            coordinator,
            primary,
            secondaries,
            maintenance,
        })
    }
}

/// An assembled, running Unified Vector Store: the coordinator plus handles
/// to the concrete providers and (usually) a running maintenance scheduler.
/// Cloning is cheap — every field is an `Arc`.
#[derive(Clone)]
pub struct UnifiedVectorStore {
    coordinator: Arc<UnifiedStoreCoordinator>,
    primary: Arc<PrimaryProvider>,
    secondaries: Vec<Arc<SecondaryProvider>>,
    maintenance: Option<Arc<MaintenanceHandle>>,
}

impl UnifiedVectorStore {
    /// The coordinator, for callers that want the full operation surface
    /// (`store`, `get`, `query`, `delete`, `update_importance`, admin ops)
    /// rather than a re-exported subset here.
    pub fn coordinator(&self) -> &Arc<UnifiedStoreCoordinator> {
        &self.coordinator
    }

    /// The primary provider, for callers driving maintenance manually
    /// (e.g. a one-off hash backfill after a bulk import).
    pub fn primary(&self) -> &Arc<PrimaryProvider> {
        &self.primary
    }

    /// Every registered secondary provider.
    pub fn secondaries(&self) -> &[Arc<SecondaryProvider>] {
        &self.secondaries
    }

    /// Health snapshot of every registered provider, keyed by name.
    pub async fn provider_health(&self) -> std::collections::HashMap<String, ProviderHealth> {
        self.coordinator.provider_health().await
    }

    /// Switch the dedup service's running mode.
    pub fn set_dedup_mode(&self, mode: DedupMode) {
        self.coordinator.set_dedup_mode(mode);
    }

    /// Run one hash-backfill pass over the primary, populating the dedup
    /// hash index for rows written before dedup was enabled.
    pub async fn rebuild_hashes(&self, batch_size: usize) {
        uvs_maintenance::rebuild_hashes_once(&self.coordinator, &self.primary, batch_size).await;
    }

    /// Cancel and await every background maintenance task, up to
    /// `timeout`. A no-op (returns `true` immediately) if the store was
    /// built with [`UnifiedVectorStoreBuilder::without_maintenance`].
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        match &self.maintenance {
            Some(handle) => handle.shutdown(timeout).await,
            None => true,
        }
    }
}

impl StoreSettings {
    fn coordinator_importance_decay_rate(&self) -> f64 {
        self.coordinator.importance_decay_rate
    }

    fn coordinator_importance_floor(&self) -> f64 {
        self.coordinator.importance_floor
    }
}
