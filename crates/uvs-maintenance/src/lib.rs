//! Periodic background maintenance for the Unified Vector Store: importance
//! decay, access-bookkeeping flush, embedding-cache eviction, hash
//! backfill, provider health polling and mirror reconciliation.
//!
//! None of these run on the request path; the coordinator stays usable
//! with this crate entirely absent, at the cost of importance scores never
//! decaying, access counts never flushing out of the primary's pending
//! map, and a down secondary never catching back up on its own.

pub mod scheduler;
pub mod tasks;

pub use scheduler::MaintenanceScheduler;

use std::sync::Arc;
use std::time::Duration;
use uvs_coordinator::UnifiedStoreCoordinator;
use uvs_providers::{PrimaryProvider, SecondaryProvider};

/// Tunable intervals and parameters for every periodic task. Defaults are
/// conservative; a high-write deployment would shorten the access-flush
/// and cache-eviction intervals.
#[derive(Debug, Clone)]
pub struct MaintenanceIntervals {
    /// How often to apply importance decay.
    pub decay: Duration,
    /// How often to flush batched access bookkeeping.
    pub access_flush: Duration,
    /// How often to sweep the embedding cache for expired entries.
    pub cache_eviction: Duration,
    /// How often to poll provider health.
    pub health_poll: Duration,
    /// How often to check secondaries for mirror drift.
    pub mirror_resync: Duration,
    /// Page size used by the hash-backfill and mirror-resync tasks.
    pub batch_size: usize,
}

impl Default for MaintenanceIntervals {
    fn default() -> Self {
        Self {
            decay: Duration::from_secs(3600),
            access_flush: Duration::from_secs(30),
            cache_eviction: Duration::from_secs(300),
            health_poll: Duration::from_secs(15),
            mirror_resync: Duration::from_secs(120),
            batch_size: 500,
        }
    }
}

/// Everything a running set of maintenance tasks needs: the coordinator
/// they serve, direct handles to the concrete provider implementations
/// (the coordinator's `ProviderPort` abstraction is deliberately too thin
/// for pagination/reconciliation ops), and the decay parameters from
/// config.
pub struct MaintenanceHandle {
    scheduler: MaintenanceScheduler,
}

impl MaintenanceHandle {
    /// Whether shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.scheduler.is_shutting_down()
    }

    /// Number of tasks currently tracked.
    pub fn active_tasks(&self) -> usize {
        self.scheduler.active_tasks()
    }

    /// Cancel every task and wait for them to exit, up to `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.scheduler.shutdown(timeout).await
    }
}

/// Spawn every periodic maintenance task against the given coordinator and
/// concrete provider handles, returning a handle that can later shut them
/// all down together.
#[allow(clippy::too_many_arguments)]
pub fn spawn_all(
    coordinator: Arc<UnifiedStoreCoordinator>,
    primary: Arc<PrimaryProvider>,
    secondaries: Vec<Arc<SecondaryProvider>>,
    importance_decay_rate: f64,
    importance_floor: f64,
    intervals: MaintenanceIntervals,
) -> MaintenanceHandle {
    let scheduler = MaintenanceScheduler::new();

    {
        let primary = primary.clone();
        scheduler.spawn_periodic("importance-decay", intervals.decay, move |_token| {
            let primary = primary.clone();
            async move {
                tasks::decay_importance(&primary, importance_decay_rate, importance_floor).await;
            }
        });
    }

    {
        let primary = primary.clone();
        scheduler.spawn_periodic("access-flush", intervals.access_flush, move |_token| {
            let primary = primary.clone();
            async move {
                tasks::flush_access_bookkeeping(&primary).await;
            }
        });
    }

    {
        let coordinator = coordinator.clone();
        scheduler.spawn_periodic("cache-eviction", intervals.cache_eviction, move |_token| {
            let coordinator = coordinator.clone();
            async move {
                tasks::evict_embedding_cache(&coordinator).await;
            }
        });
    }

    {
        let primary = primary.clone();
        let secondaries = secondaries.clone();
        scheduler.spawn_periodic("health-poll", intervals.health_poll, move |_token| {
            let primary = primary.clone();
            let secondaries = secondaries.clone();
            async move {
                tasks::poll_provider_health(&primary, &secondaries).await;
            }
        });
    }

    {
        let primary = primary.clone();
        let secondaries = secondaries.clone();
        let batch_size = intervals.batch_size;
        scheduler.spawn_periodic("mirror-resync", intervals.mirror_resync, move |_token| {
            let primary = primary.clone();
            let secondaries = secondaries.clone();
            async move {
                for secondary in &secondaries {
                    tasks::resync_secondary(&primary, secondary, batch_size).await;
                }
            }
        });
    }

    MaintenanceHandle { scheduler }
}

/// Run a single hash-backfill pass over the primary, recording a content
/// hash for every row through the coordinator's dedup service. Exposed
/// separately from [`spawn_all`] since it is typically invoked once after
/// a bulk import or a dedup-mode change, not on a fixed schedule.
pub async fn rebuild_hashes_once(coordinator: &Arc<UnifiedStoreCoordinator>, primary: &Arc<PrimaryProvider>, batch_size: usize) {
    tasks::rebuild_hashes(coordinator, primary, batch_size, tokio_util::sync::CancellationToken::new()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uvs_coordinator::{ProviderEntry, ProviderRegistry, UnifiedStoreConfig};
    use uvs_dedup::{DedupService, DedupServiceConfig};
    use uvs_domain::value_objects::{ProviderDescriptor, ProviderRole};
    use uvs_embedding::models::PseudoEmbeddingModel;
    use uvs_embedding::{EmbeddingPipeline, EmbeddingPipelineConfig};
    use uvs_providers::PrimaryProviderConfig;

    async fn build(dim: usize) -> (Arc<UnifiedStoreCoordinator>, Arc<PrimaryProvider>) {
        let registry = ProviderRegistry::new();
        let primary = Arc::new(PrimaryProvider::new(PrimaryProviderConfig {
            name: "primary".to_string(),
            dimension: dim,
            ..Default::default()
        }));
        primary.initialize().await.unwrap();
        registry
            .register(ProviderEntry {
                descriptor: ProviderDescriptor {
                    name: "primary".to_string(),
                    role: ProviderRole::Primary,
                    enabled: true,
                    dimension: dim,
                },
                port: primary.clone(),
            })
            .unwrap();

        let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(dim))];
        let embedding = Arc::new(EmbeddingPipeline::new(
            chain,
            EmbeddingPipelineConfig {
                dimension: dim,
                ..Default::default()
            },
        ));
        let probe = Arc::new(uvs_coordinator::PrimaryVectorProbe::new(registry.clone()));
        let dedup = Arc::new(DedupService::new(probe, DedupServiceConfig::default()));
        let config = UnifiedStoreConfig {
            primary_provider_name: "primary".to_string(),
            embedding_dim: dim,
            ..Default::default()
        };
        let coordinator = Arc::new(UnifiedStoreCoordinator::new(config, registry, embedding, dedup).unwrap());
        (coordinator, primary)
    }

    #[tokio::test]
    async fn rebuild_hashes_once_covers_every_row() {
        let (coordinator, primary) = build(4).await;
        coordinator.store("alpha", HashMap::new(), None).await.unwrap();
        coordinator.store("beta", HashMap::new(), None).await.unwrap();

        rebuild_hashes_once(&coordinator, &primary, 1).await;

        // A repeat store of the same content should now collapse as a
        // duplicate, proving the hash index was populated.
        coordinator.set_dedup_mode(uvs_domain::value_objects::DedupMode::Active);
        let again = coordinator.store("alpha", HashMap::new(), None).await.unwrap();
        assert!(again.metadata.contains_key("duplicate_of"));
    }

    #[tokio::test]
    async fn spawn_all_starts_every_task_and_shuts_down_cleanly() {
        let (coordinator, primary) = build(4).await;
        let handle = spawn_all(
            coordinator,
            primary,
            Vec::new(),
            0.01,
            0.05,
            MaintenanceIntervals {
                decay: Duration::from_millis(10),
                access_flush: Duration::from_millis(10),
                cache_eviction: Duration::from_millis(10),
                health_poll: Duration::from_millis(10),
                mirror_resync: Duration::from_millis(10),
                batch_size: 10,
            },
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.active_tasks(), 5);
        assert!(handle.shutdown(Duration::from_secs(1)).await);
    }
}
