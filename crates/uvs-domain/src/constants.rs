//! Shared defaults for the Unified Vector Store core.
//!
//! Centralized so the coordinator, providers and dedup service agree on the
//! same fallbacks without importing each other's config types.

/// Default embedding dimension (typically 1536 for common text models).
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Default maximum content length in bytes.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;

/// Default query result limit when the caller does not specify one.
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Hard ceiling a caller-supplied `limit` is clamped to.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Default `min_similarity` when a query text is present.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.3;

/// Default per-provider query deadline in milliseconds.
pub const DEFAULT_QUERY_DEADLINE_MS: u64 = 2_000;

/// Default per-provider store deadline in milliseconds.
pub const DEFAULT_STORE_DEADLINE_MS: u64 = 5_000;

/// Default per-provider admin-op deadline in milliseconds.
pub const DEFAULT_ADMIN_DEADLINE_MS: u64 = 10_000;

/// Default pool acquisition timeout in milliseconds.
pub const DEFAULT_POOL_ACQUIRE_TIMEOUT_MS: u64 = 3_000;

/// Default consecutive health failures before `Ready` → `Degraded`.
pub const DEFAULT_DEGRADE_AFTER_FAILURES: u32 = 3;

/// Default dedup vector-tier candidate count.
pub const DEFAULT_DEDUP_TOP_K: usize = 5;

/// Default dedup similarity threshold for `active` mode.
pub const DEFAULT_DEDUP_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Default dedup similarity threshold for `strict` mode.
pub const DEFAULT_DEDUP_STRICT_SIMILARITY_THRESHOLD: f64 = 0.90;

/// Default embedding cache capacity.
pub const DEFAULT_EMBEDDING_CACHE_SIZE: u64 = 10_000;

/// Default embedding cache TTL in seconds.
pub const DEFAULT_EMBEDDING_CACHE_TTL_SECS: u64 = 3_600;

/// Default importance decay rate applied per maintenance tick.
pub const DEFAULT_IMPORTANCE_DECAY_RATE: f64 = 0.01;

/// Default floor importance decay will not cross.
pub const DEFAULT_IMPORTANCE_FLOOR: f64 = 0.05;

/// Default mirror fan-out queue capacity per secondary provider.
pub const DEFAULT_MIRROR_QUEUE_CAPACITY: usize = 1024;

/// Tag stamped into metadata when an embedding came from the deterministic
/// pseudo-embedding fallback, so callers can reprocess later.
pub const METADATA_KEY_PSEUDO_EMBEDDING: &str = "pseudo_embedding";

/// Metadata key marking a memory written under fail-open policy, pending
/// reconciliation onto the primary.
pub const METADATA_KEY_PENDING_PRIMARY: &str = "pending_primary";

/// Metadata key annotating the canonical id a duplicate was collapsed onto.
pub const METADATA_KEY_DUPLICATE_OF: &str = "duplicate_of";

/// Metadata key stamped by `get` when a result was served from a secondary
/// provider.
pub const METADATA_KEY_SOURCE_PROVIDER: &str = "source_provider";

/// Default environment variable prefix for configuration overrides.
pub const CONFIG_ENV_PREFIX: &str = "UVS";
