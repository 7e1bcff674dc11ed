//! The coordinator's single validated configuration value.
//!
//! Loaded once at init the way the teacher's `ConfigLoader` composes a
//! `figment::Figment` from defaults → file → env (the facade crate owns
//! that composition; this type is the `Deserialize` target). Runtime
//! mutation afterwards only happens through named admin ops
//! (`set_dedup_mode`, ...), never by handing callers a mutable config.

use serde::{Deserialize, Serialize};
use uvs_domain::constants::*;
use uvs_domain::error::{Error, Result};
use uvs_domain::value_objects::DedupMode;

/// Which backend absorbs a write when the primary provider reports
/// `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailoverMode {
    /// Surface the error to the caller (§4.6 step 4 default).
    #[default]
    FailClosed,
    /// Write to a secondary instead, flagging `metadata.pending_primary`.
    FailOpen,
}

/// Validated configuration for [`crate::coordinator::UnifiedStoreCoordinator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedStoreConfig {
    /// Starting dedup mode.
    pub dedup_mode: DedupMode,
    /// Vector-tier similarity threshold (`T_sim`) used in `active` mode.
    pub dedup_similarity_threshold: f64,
    /// When `true`, only the hash tier ever runs.
    pub dedup_exact_match_only: bool,
    /// Name of the provider registered with role `Primary`.
    pub primary_provider_name: String,
    /// Global embedding dimension; every provider must agree.
    pub embedding_dim: usize,
    /// Embedding cache capacity.
    pub embedding_cache_size: u64,
    /// Embedding cache time-to-live, in seconds.
    pub embedding_cache_ttl: u64,
    /// Primary-write failure policy.
    pub write_failover_mode: WriteFailoverMode,
    /// Per-provider query deadline, in milliseconds.
    pub query_deadline_ms: u64,
    /// Per-provider store deadline, in milliseconds.
    pub store_deadline_ms: u64,
    /// Per-provider admin-op deadline, in milliseconds.
    pub admin_deadline_ms: u64,
    /// Importance decay rate applied per maintenance tick.
    pub importance_decay_rate: f64,
    /// Floor importance decay will not cross.
    pub importance_floor: f64,
    /// Whether to notify the knowledge-graph collaborator on writes.
    pub graph_enabled: bool,
    /// Maximum content length in bytes after normalization.
    pub max_content_bytes: usize,
    /// Consecutive health-check failures before `Ready` → `Degraded`.
    pub degrade_after_failures: u32,
}

impl Default for UnifiedStoreConfig {
    fn default() -> Self {
        Self {
            dedup_mode: DedupMode::Active,
            dedup_similarity_threshold: DEFAULT_DEDUP_SIMILARITY_THRESHOLD,
            dedup_exact_match_only: false,
            primary_provider_name: "primary".to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            embedding_cache_size: DEFAULT_EMBEDDING_CACHE_SIZE,
            embedding_cache_ttl: DEFAULT_EMBEDDING_CACHE_TTL_SECS,
            write_failover_mode: WriteFailoverMode::FailClosed,
            query_deadline_ms: DEFAULT_QUERY_DEADLINE_MS,
            store_deadline_ms: DEFAULT_STORE_DEADLINE_MS,
            admin_deadline_ms: DEFAULT_ADMIN_DEADLINE_MS,
            importance_decay_rate: DEFAULT_IMPORTANCE_DECAY_RATE,
            importance_floor: DEFAULT_IMPORTANCE_FLOOR,
            graph_enabled: true,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            degrade_after_failures: DEFAULT_DEGRADE_AFTER_FAILURES,
        }
    }
}

impl UnifiedStoreConfig {
    /// Validate the configuration, rejecting values that would violate a
    /// documented invariant before the coordinator is ever built.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(Error::invalid_input("embedding_dim", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.dedup_similarity_threshold) {
            return Err(Error::invalid_input(
                "dedup_similarity_threshold",
                "must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.importance_floor) {
            return Err(Error::invalid_input("importance_floor", "must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.importance_decay_rate) {
            return Err(Error::invalid_input(
                "importance_decay_rate",
                "must be in [0, 1]",
            ));
        }
        if self.max_content_bytes == 0 {
            return Err(Error::invalid_input("max_content_bytes", "must be non-zero"));
        }
        if self.primary_provider_name.trim().is_empty() {
            return Err(Error::invalid_input(
                "primary_provider_name",
                "must be non-empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        UnifiedStoreConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = UnifiedStoreConfig {
            dedup_similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
