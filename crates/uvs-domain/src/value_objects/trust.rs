//! Query envelope and trust metadata.

use serde::{Deserialize, Serialize};

/// Which code path serviced a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Empty-query fast path (`get_recent`, no embedding call).
    Empty,
    /// Normal similarity search.
    Similarity,
}

/// Metadata describing which providers contributed to a query result and
/// how complete the answer is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustBlock {
    /// Providers that returned results.
    pub providers_used: Vec<String>,
    /// Providers that were dispatched to but failed or timed out.
    pub providers_failed: Vec<String>,
    /// `returned / total_estimate`, in `[0, 1]`.
    pub data_completeness: f64,
    /// Which code path produced this result.
    pub query_type: QueryType,
    /// Coarse confidence signal derived from completeness and provider mix.
    pub confidence_score: f64,
}

impl TrustBlock {
    /// Build a trust block, deriving `confidence_score` from completeness
    /// and whether any provider failed.
    pub fn new(
        providers_used: Vec<String>,
        providers_failed: Vec<String>,
        data_completeness: f64,
        query_type: QueryType,
    ) -> Self {
        let penalty = if providers_failed.is_empty() { 0.0 } else { 0.15 };
        let confidence_score = (data_completeness - penalty).clamp(0.0, 1.0);
        Self {
            providers_used,
            providers_failed,
            data_completeness,
            query_type,
            confidence_score,
        }
    }
}

/// One scored hit returned from a provider query, the unit the coordinator
/// merges across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    /// The stored memory.
    pub memory: crate::value_objects::memory::Memory,
    /// Cosine-based similarity in `[0, 1]`; `1.0` for recency-ordered results.
    pub score: f64,
    /// Name of the provider that produced this hit.
    pub source_provider: String,
}
