//! End-to-end scenarios against the coordinator wired with the in-process
//! primary/secondary providers and a deterministic pseudo-embedding model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uvs_coordinator::{
    ProviderEntry, ProviderRegistry, QueryRequest, UnifiedStoreConfig, UnifiedStoreCoordinator,
};
use uvs_dedup::{DedupService, DedupServiceConfig};
use uvs_domain::value_objects::{DedupMode, ProviderDescriptor, ProviderRole};
use uvs_embedding::models::PseudoEmbeddingModel;
use uvs_embedding::{EmbeddingPipeline, EmbeddingPipelineConfig};
use uvs_providers::{PrimaryProvider, PrimaryProviderConfig, SecondaryProvider};

const DIM: usize = 8;

async fn build_coordinator(dedup_mode: DedupMode) -> (UnifiedStoreCoordinator, Arc<PrimaryProvider>, Arc<SecondaryProvider>) {
    let registry = ProviderRegistry::new();

    let primary = Arc::new(PrimaryProvider::new(PrimaryProviderConfig {
        name: "primary".to_string(),
        dimension: DIM,
        ..Default::default()
    }));
    primary.initialize().await.unwrap();
    registry
        .register(ProviderEntry {
            descriptor: ProviderDescriptor {
                name: "primary".to_string(),
                role: ProviderRole::Primary,
                enabled: true,
                dimension: DIM,
            },
            port: primary.clone(),
        })
        .unwrap();

    let secondary = Arc::new(SecondaryProvider::new("secondary", DIM));
    secondary.initialize().await.unwrap();
    registry
        .register(ProviderEntry {
            descriptor: ProviderDescriptor {
                name: "secondary".to_string(),
                role: ProviderRole::Secondary,
                enabled: true,
                dimension: DIM,
            },
            port: secondary.clone(),
        })
        .unwrap();

    let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(DIM))];
    let embedding = Arc::new(EmbeddingPipeline::new(
        chain,
        EmbeddingPipelineConfig {
            dimension: DIM,
            ..Default::default()
        },
    ));

    let probe = Arc::new(uvs_coordinator::PrimaryVectorProbe::new(registry.clone()));
    let dedup = Arc::new(DedupService::new(
        probe,
        DedupServiceConfig {
            mode: dedup_mode,
            ..Default::default()
        },
    ));

    let config = UnifiedStoreConfig {
        primary_provider_name: "primary".to_string(),
        embedding_dim: DIM,
        dedup_mode,
        ..Default::default()
    };

    let coordinator = UnifiedStoreCoordinator::new(config, registry, embedding, dedup).unwrap();
    (coordinator, primary, secondary)
}

#[tokio::test]
async fn read_after_write_is_immediate() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    let stored = coordinator.store("the quick brown fox", HashMap::new(), None).await.unwrap();
    let fetched = coordinator.get(stored.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, stored.id);
    assert_eq!(fetched.content, "the quick brown fox");
}

#[tokio::test]
async fn empty_query_never_touches_embedding_pipeline() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    coordinator.store("alpha", HashMap::new(), None).await.unwrap();
    coordinator.store("beta", HashMap::new(), None).await.unwrap();

    let envelope = coordinator
        .query(QueryRequest {
            query_text: None,
            limit: 10,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(envelope.memories.len(), 2);
    assert_eq!(envelope.trust.query_type, uvs_domain::value_objects::QueryType::Empty);
    // Newest first.
    assert_eq!(envelope.memories[0].memory.content, "beta");
}

#[tokio::test]
async fn exact_duplicate_collapses_onto_canonical_memory() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Active).await;
    let first = coordinator.store("duplicate content", HashMap::new(), None).await.unwrap();
    let second = coordinator.store("duplicate content", HashMap::new(), None).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(
        second.metadata.get("duplicate_of").and_then(|v| v.as_str()),
        Some(first.id.to_string()).as_deref()
    );
}

#[tokio::test]
async fn dedup_off_stores_byte_identical_duplicates_as_distinct_rows() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    let first = coordinator.store("same text", HashMap::new(), None).await.unwrap();
    let second = coordinator.store("same text", HashMap::new(), None).await.unwrap();
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    let stored = coordinator.store("to be deleted", HashMap::new(), None).await.unwrap();
    assert!(coordinator.delete(stored.id).await.unwrap());
    assert!(!coordinator.delete(stored.id).await.unwrap());
    assert!(coordinator.get(stored.id).await.unwrap().is_none());
}

#[tokio::test]
async fn query_fails_over_to_secondary_when_primary_degraded() {
    let (coordinator, primary, secondary) = build_coordinator(DedupMode::Off).await;

    let stored = coordinator.store("fallback candidate", HashMap::new(), None).await.unwrap();
    // Let the spawned mirror fan-out task land the row on the secondary.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(secondary.row_count() > 0);

    primary.record_health_result(false);
    primary.record_health_result(false);
    primary.record_health_result(false);
    assert_eq!(primary.state(), uvs_domain::value_objects::ProviderState::Degraded);

    let envelope = coordinator
        .query(QueryRequest {
            query_text: None,
            limit: 10,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(envelope.trust.providers_failed.contains(&"primary".to_string()));
    assert!(envelope.memories.iter().any(|m| m.memory.id == stored.id));
}

#[tokio::test]
async fn similarity_query_fails_over_to_secondary_when_primary_degraded() {
    let (coordinator, primary, secondary) = build_coordinator(DedupMode::Off).await;

    let stored = coordinator.store("fallback candidate", HashMap::new(), None).await.unwrap();
    // Let the spawned mirror fan-out task land the row on the secondary.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(secondary.row_count() > 0);

    primary.record_health_result(false);
    primary.record_health_result(false);
    primary.record_health_result(false);
    assert_eq!(primary.state(), uvs_domain::value_objects::ProviderState::Degraded);

    let envelope = coordinator
        .query(QueryRequest {
            query_text: Some("fallback candidate".to_string()),
            limit: 10,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(envelope.trust.providers_failed.contains(&"primary".to_string()));
    assert!(!envelope.trust.providers_used.contains(&"primary".to_string()));
    assert!(envelope.memories.iter().any(|m| m.memory.id == stored.id));
}

#[tokio::test]
async fn query_with_limit_zero_short_circuits_without_dispatch() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    coordinator.store("alpha", HashMap::new(), None).await.unwrap();

    let envelope = coordinator
        .query(QueryRequest {
            query_text: Some("alpha".to_string()),
            limit: 0,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(envelope.memories.is_empty());
    assert_eq!(envelope.total_found, 0);
    assert!(envelope.trust.providers_used.is_empty());
    assert!(envelope.trust.providers_failed.is_empty());

    // An absent-limit default of 10 is the excluded HTTP layer's concern;
    // the coordinator itself never turns limit=0 into a non-empty answer.
    let empty_path_envelope = coordinator
        .query(QueryRequest {
            query_text: None,
            limit: 0,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(empty_path_envelope.memories.is_empty());
}

#[tokio::test]
async fn relax_similarity_if_incomplete_backfills_below_threshold_hits() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    let stored = coordinator.store("red fox in the forest", HashMap::new(), None).await.unwrap();

    // Two unrelated pseudo-embeddings land nowhere near a 0.9 cosine
    // similarity, so a strict threshold filters the stored row out.
    let strict = coordinator
        .query(QueryRequest {
            query_text: Some("unrelated quarterly tax filing".to_string()),
            limit: 5,
            min_similarity: 0.9,
            relax_similarity_if_incomplete: false,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!strict.memories.iter().any(|m| m.memory.id == stored.id));

    let relaxed = coordinator
        .query(QueryRequest {
            query_text: Some("unrelated quarterly tax filing".to_string()),
            limit: 5,
            min_similarity: 0.9,
            relax_similarity_if_incomplete: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(relaxed.memories.iter().any(|m| m.memory.id == stored.id));
}

#[tokio::test]
async fn query_rejects_out_of_range_min_similarity() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    let err = coordinator
        .query(QueryRequest {
            query_text: Some("hello".to_string()),
            limit: 10,
            min_similarity: 1.5,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, uvs_domain::error::Error::InvalidInput { .. }));
}

#[tokio::test]
async fn store_rejects_content_over_the_configured_size_bound() {
    let (coordinator, _primary, _secondary) = build_coordinator(DedupMode::Off).await;
    // Coordinator config wasn't overridden for this helper, so fall back to
    // a fresh one with a tight bound.
    let registry = ProviderRegistry::new();
    let primary = Arc::new(PrimaryProvider::new(PrimaryProviderConfig {
        name: "primary".to_string(),
        dimension: DIM,
        ..Default::default()
    }));
    primary.initialize().await.unwrap();
    registry
        .register(ProviderEntry {
            descriptor: ProviderDescriptor {
                name: "primary".to_string(),
                role: ProviderRole::Primary,
                enabled: true,
                dimension: DIM,
            },
            port: primary,
        })
        .unwrap();
    let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(DIM))];
    let embedding = Arc::new(EmbeddingPipeline::new(
        chain,
        EmbeddingPipelineConfig {
            dimension: DIM,
            ..Default::default()
        },
    ));
    let probe = Arc::new(uvs_coordinator::PrimaryVectorProbe::new(registry.clone()));
    let dedup = Arc::new(DedupService::new(probe, DedupServiceConfig::default()));
    let config = UnifiedStoreConfig {
        primary_provider_name: "primary".to_string(),
        embedding_dim: DIM,
        max_content_bytes: 4,
        ..Default::default()
    };
    let tight_coordinator = UnifiedStoreCoordinator::new(config, registry, embedding, dedup).unwrap();

    let err = tight_coordinator
        .store("way too long for the bound", HashMap::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, uvs_domain::error::Error::InvalidInput { .. }));

    // Sanity: the unrelated coordinator from the shared fixture is unaffected.
    coordinator.store("fits fine", HashMap::new(), None).await.unwrap();
}
