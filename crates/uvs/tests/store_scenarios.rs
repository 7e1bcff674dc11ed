//! End-to-end scenarios against the fully-wired facade: real providers, a
//! deterministic embedding model and the coordinator/maintenance wiring
//! the builder assembles, rather than the coordinator crate's own
//! lower-level fixtures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uvs::{DedupMode, ProviderState, QueryRequest, UnifiedVectorStoreBuilder};
use uvs_embedding::models::PseudoEmbeddingModel;

const DIM: usize = 8;

async fn build_store(dedup_mode: DedupMode) -> uvs::UnifiedVectorStore {
    let mut settings = uvs::StoreSettings::default();
    settings.coordinator.embedding_dim = DIM;
    settings.coordinator.dedup_mode = dedup_mode;
    let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(DIM))];
    UnifiedVectorStoreBuilder::new(settings, chain)
        .without_maintenance()
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn read_after_write_round_trips_through_the_full_build() {
    let store = build_store(DedupMode::Off).await;
    let stored = store.coordinator().store("rw-test", HashMap::new(), None).await.unwrap();
    let fetched = store.coordinator().get(stored.id).await.unwrap().unwrap();
    assert_eq!(fetched.content, "rw-test");

    let envelope = store
        .coordinator()
        .query(QueryRequest {
            query_text: None,
            limit: 1,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(envelope.memories[0].memory.id, stored.id);
}

#[tokio::test]
async fn update_importance_is_idempotent() {
    let store = build_store(DedupMode::Off).await;
    let stored = store.coordinator().store("importance target", HashMap::new(), None).await.unwrap();

    store.coordinator().update_importance(stored.id, 0.75).await.unwrap();
    let once = store.coordinator().get(stored.id).await.unwrap().unwrap();
    store.coordinator().update_importance(stored.id, 0.75).await.unwrap();
    let twice = store.coordinator().get(stored.id).await.unwrap().unwrap();

    assert!((once.importance_score - 0.75).abs() < f64::EPSILON);
    assert!((twice.importance_score - 0.75).abs() < f64::EPSILON);
}

#[tokio::test]
async fn get_recent_is_strictly_ordered_and_bounded() {
    let store = build_store(DedupMode::Off).await;
    for text in ["m1", "m2", "m3", "m4", "m5"] {
        store.coordinator().store(text, HashMap::new(), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let envelope = store
        .coordinator()
        .query(QueryRequest {
            query_text: None,
            limit: 3,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(envelope.memories.len(), 3);
    assert_eq!(envelope.memories[0].memory.content, "m5");
    assert_eq!(envelope.memories[1].memory.content, "m4");
    assert_eq!(envelope.memories[2].memory.content, "m3");
    for pair in envelope.memories.windows(2) {
        assert!(pair[0].memory.created_at >= pair[1].memory.created_at);
    }
}

#[tokio::test]
async fn delete_then_query_omits_the_id() {
    let store = build_store(DedupMode::Off).await;
    let stored = store.coordinator().store("ephemeral", HashMap::new(), None).await.unwrap();
    assert!(store.coordinator().delete(stored.id).await.unwrap());

    let envelope = store
        .coordinator()
        .query(QueryRequest {
            query_text: None,
            limit: 10,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!envelope.memories.iter().any(|m| m.memory.id == stored.id));
}

#[tokio::test]
async fn cancelling_a_store_mid_flight_leaves_no_partial_row() {
    let store = build_store(DedupMode::Off).await;
    let task_store = store.clone();
    let handle = tokio::spawn(async move {
        let _ = task_store.coordinator().store("x", HashMap::new(), None).await;
    });

    tokio::time::sleep(Duration::from_millis(1)).await;
    handle.abort();
    let _ = handle.await;

    // Give any in-flight write a moment to either finish or stay aborted,
    // then confirm no half-written "x" row is observable.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let envelope = store
        .coordinator()
        .query(QueryRequest {
            query_text: None,
            limit: 100,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();
    let half_written = envelope
        .memories
        .iter()
        .any(|m| m.memory.content == "x" && m.memory.embedding.vector.is_empty());
    assert!(!half_written);
}

#[tokio::test]
async fn multi_provider_query_merges_without_duplicate_ids() {
    let mut settings = uvs::StoreSettings::default();
    settings.coordinator.embedding_dim = DIM;
    settings.coordinator.dedup_mode = DedupMode::Off;
    settings.secondary_provider_names = vec!["secondary".to_string()];
    let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(DIM))];
    let store = UnifiedVectorStoreBuilder::new(settings, chain)
        .without_maintenance()
        .build()
        .await
        .unwrap();

    let stored = store.coordinator().store("shared across providers", HashMap::new(), None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let envelope = store
        .coordinator()
        .query(QueryRequest {
            query_text: None,
            limit: 10,
            min_similarity: 0.0,
            ..Default::default()
        })
        .await
        .unwrap();

    let matches: Vec<_> = envelope.memories.iter().filter(|m| m.memory.id == stored.id).collect();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn provider_health_reports_every_registered_provider() {
    let mut settings = uvs::StoreSettings::default();
    settings.coordinator.embedding_dim = DIM;
    settings.secondary_provider_names = vec!["secondary".to_string()];
    let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(DIM))];
    let store = UnifiedVectorStoreBuilder::new(settings, chain)
        .without_maintenance()
        .build()
        .await
        .unwrap();

    let health = store.provider_health().await;
    assert_eq!(health.len(), 2);
    assert!(health.contains_key("primary"));
    assert!(health.contains_key("secondary"));
    assert!(health["primary"].status.is_usable());
}

#[tokio::test]
async fn rebuild_hashes_lets_previously_unhashed_rows_dedup() {
    let store = build_store(DedupMode::Off).await;
    let first = store.coordinator().store("backfill me", HashMap::new(), None).await.unwrap();

    store.rebuild_hashes(10).await;
    store.set_dedup_mode(DedupMode::Active);

    let second = store.coordinator().store("backfill me", HashMap::new(), None).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn shutdown_without_maintenance_is_a_harmless_no_op() {
    let store = build_store(DedupMode::Off).await;
    assert!(store.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn maintenance_scheduler_starts_and_stops_with_the_store() {
    let mut settings = uvs::StoreSettings::default();
    settings.coordinator.embedding_dim = DIM;
    settings.maintenance.decay_interval_secs = 1;
    settings.maintenance.access_flush_interval_secs = 1;
    settings.maintenance.cache_eviction_interval_secs = 1;
    settings.maintenance.health_poll_interval_secs = 1;
    settings.maintenance.mirror_resync_interval_secs = 1;
    let chain: Vec<Arc<dyn uvs_domain::ports::EmbeddingModel>> = vec![Arc::new(PseudoEmbeddingModel::new(DIM))];
    let store = UnifiedVectorStoreBuilder::new(settings, chain).build().await.unwrap();

    assert!(store.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn provider_state_is_ready_immediately_after_build() {
    let store = build_store(DedupMode::Off).await;
    let health = store.provider_health().await;
    assert_eq!(health["primary"].status, ProviderState::Ready);
}
