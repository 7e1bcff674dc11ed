//! Individual maintenance task bodies. Each is a plain async function the
//! scheduler invokes on a timer; none block for longer than one pass over
//! their target and all tolerate being cancelled mid-pass.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uvs_coordinator::UnifiedStoreCoordinator;
use uvs_providers::{PrimaryProvider, SecondaryProvider};

/// Tick: decay every primary memory's importance score toward `floor` by
/// `rate`, per maintenance pass.
pub async fn decay_importance(primary: &Arc<PrimaryProvider>, rate: f64, floor: f64) {
    let touched = primary.decay_importance_scores(rate, floor).await;
    if touched > 0 {
        info!(touched, "applied importance decay");
    }
}

/// Tick: flush batched access-count/last-accessed bookkeeping from the
/// primary's pending-access map into its heap.
pub async fn flush_access_bookkeeping(primary: &Arc<PrimaryProvider>) {
    let flushed = primary.flush_access_bookkeeping().await;
    if flushed > 0 {
        info!(flushed, "flushed access bookkeeping");
    }
}

/// Tick: run the embedding cache's pending TTL/capacity eviction sweep.
pub async fn evict_embedding_cache(coordinator: &Arc<UnifiedStoreCoordinator>) {
    coordinator.embedding().cache().run_pending_tasks().await;
}

/// Tick: probe the primary with a trivial read and feed the outcome into
/// its consecutive-failure counter, so degrade/recover transitions happen
/// even when no query traffic is flowing. A real backend's equivalent
/// probe is a connection ping; this stand-in reuses `get_recent`, the
/// cheapest operation that still exercises the provider's usability gate.
pub async fn poll_provider_health(primary: &Arc<PrimaryProvider>, secondaries: &[Arc<SecondaryProvider>]) {
    use uvs_domain::ports::ProviderPort;
    let probe = ProviderPort::get_recent(primary.as_ref(), 1, &uvs_domain::value_objects::Filters::new()).await;
    primary.record_health_result(probe.is_ok());

    for secondary in secondaries {
        let _ = ProviderPort::get_recent(secondary.as_ref(), 1, &uvs_domain::value_objects::Filters::new()).await;
    }
}

/// One pass of hash backfill: page through the primary in batches,
/// recording a content hash for any row the dedup service doesn't already
/// have one for (e.g. rows restored from a snapshot, or written before
/// dedup was enabled). Cancellable between batches.
pub async fn rebuild_hashes(
    coordinator: &Arc<UnifiedStoreCoordinator>,
    primary: &Arc<PrimaryProvider>,
    batch_size: usize,
    cancel: CancellationToken,
) {
    let mut offset = 0;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let batch = primary.list_batch(offset, batch_size).await;
        if batch.is_empty() {
            break;
        }
        for (id, content) in &batch {
            let normalized = uvs_domain::normalize::normalize(content);
            coordinator.dedup().record_hash(&normalized, *id);
        }
        offset += batch.len();
        tokio::task::yield_now().await;
    }
}

/// One pass of mirror reconciliation: compare the primary's and each
/// secondary's row count and re-mirror any primary row missing from a
/// secondary. A cheap divergence signal, not a full diff — drift this
/// doesn't catch (same counts, different ids) self-heals the next time
/// those rows are written or deleted through the coordinator.
pub async fn resync_secondary(primary: &Arc<PrimaryProvider>, secondary: &Arc<SecondaryProvider>, batch_size: usize) {
    let primary_count = primary.row_count().await;
    let secondary_count = secondary.row_count();
    if secondary_count >= primary_count {
        return;
    }
    warn!(
        primary_count,
        secondary_count, "secondary lagging primary, resyncing a batch"
    );
    let mut offset = 0;
    loop {
        let batch = primary.list_batch(offset, batch_size).await;
        if batch.is_empty() {
            break;
        }
        for (id, _content) in &batch {
            if let Ok(Some(memory)) = {
                use uvs_domain::ports::ProviderPort;
                ProviderPort::get_by_id(primary.as_ref(), *id).await
            } {
                secondary.mirror_insert(memory);
            }
        }
        offset += batch.len();
        if offset >= primary_count {
            break;
        }
        tokio::time::sleep(RECONCILE_BATCH_PAUSE).await;
    }
}

/// Backoff helper: maintenance tasks triggered by failure conditions (e.g.
/// a resync loop) should not hammer providers; this is the default pause
/// between reconciliation batches when a task chooses to self-throttle.
pub const RECONCILE_BATCH_PAUSE: Duration = Duration::from_millis(50);
