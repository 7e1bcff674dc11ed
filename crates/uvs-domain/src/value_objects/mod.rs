//! Value objects shared across the Unified Vector Store core.

pub mod dedup;
pub mod embedding;
pub mod memory;
pub mod provider;
pub mod trust;

pub use dedup::{DedupDecision, DedupMode, DedupOutcome, DedupReview, DedupTier};
pub use embedding::{cosine_similarity_unit, Embedding};
pub use memory::{ContentHash, Memory};
pub use provider::{ProviderDescriptor, ProviderHealth, ProviderRole, ProviderState};
pub use trust::{QueryType, ScoredMemory, TrustBlock};

/// Free-form equality filters applied to a query or recent-memories call.
/// Keys are metadata field names, values are the exact JSON value a
/// matching memory's metadata must hold.
pub type Filters = std::collections::HashMap<String, serde_json::Value>;

/// Check whether a memory's metadata satisfies a filter set.
pub fn matches_filters(metadata: &std::collections::HashMap<String, serde_json::Value>, filters: &Filters) -> bool {
    filters.iter().all(|(k, v)| metadata.get(k) == Some(v))
}
