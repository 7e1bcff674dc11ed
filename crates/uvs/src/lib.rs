//! Facade crate for the Unified Vector Store: wires the domain contract
//! (`uvs-domain`), the embedding pipeline (`uvs-embedding`), the
//! deduplication service (`uvs-dedup`), the primary/secondary providers
//! (`uvs-providers`), the coordinator (`uvs-coordinator`) and the
//! background maintenance tasks (`uvs-maintenance`) into one type an
//! embedding application constructs once and calls into.
//!
//! This crate has no process entry point of its own — no CLI, no HTTP
//! surface — the embedder owns that; see the workspace's stated
//! non-goals. It is the thing such a process would depend on.

pub mod config;
pub mod logging;
pub mod store;

pub use config::{ConfigLoader, LoggingSettings, MaintenanceSettings, PoolSettings, StoreSettings};
pub use logging::init_logging;
pub use store::{UnifiedVectorStore, UnifiedVectorStoreBuilder};

// Re-export the operation surface so a caller with only `uvs` as a
// dependency never has to reach for the individual crates directly.
pub use uvs_coordinator::{QueryEnvelope, QueryRequest, WriteFailoverMode};
pub use uvs_domain::error::{Error, Result};
pub use uvs_domain::value_objects::{
    ContentHash, DedupMode, DedupOutcome, DedupReview, DedupTier, Memory, ProviderHealth, ProviderRole,
    ProviderState, QueryType, ScoredMemory, TrustBlock,
};
pub use uvs_domain::ports::{noop_hook, EmbeddingModel, HookHandle, InstrumentationHook, NoopHook};
pub use uvs_embedding::models::{CountingEmbeddingModel, FailingEmbeddingModel, PseudoEmbeddingModel};
