//! Deduplication value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Governs whether the dedup service's decision blocks a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Pipeline never runs.
    Off,
    /// Pipeline runs and is recorded, but never blocks the write.
    LogOnly,
    /// Duplicates are collapsed onto their canonical memory.
    #[default]
    Active,
    /// Like `Active`, with a lower similarity threshold and all tiers must
    /// concur-or-abstain.
    Strict,
}

/// Which tier of the dedup pipeline produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupTier {
    /// Exact content-hash match.
    Hash,
    /// Vector similarity match against the primary provider.
    Vector,
    /// Business-rule predicate match.
    Rule,
}

/// Final disposition recorded for a dedup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupDecision {
    /// Candidate collapses onto an existing memory.
    Duplicate,
    /// Candidate is distinct from everything probed.
    Unique,
    /// Ambiguous; a human should review (reserved for future rule tiers).
    Review,
}

/// Outcome of running the dedup pipeline against a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupOutcome {
    /// Whether the candidate is considered a duplicate under the active mode.
    pub is_duplicate: bool,
    /// The pre-existing memory the candidate collapses onto, if any.
    pub canonical_id: Option<Uuid>,
    /// Tier that produced the decision, if any tier fired.
    pub tier: Option<DedupTier>,
    /// Similarity score backing the decision (1.0 for exact hash matches).
    pub score: f64,
    /// Human-readable justification, useful in review records and logs.
    pub reason: String,
}

impl DedupOutcome {
    /// The "no duplicate found" outcome.
    pub fn unique() -> Self {
        Self {
            is_duplicate: false,
            canonical_id: None,
            tier: None,
            score: 0.0,
            reason: "no match in any tier".to_string(),
        }
    }
}

/// Append-only audit record of a non-trivial dedup decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupReview {
    /// Id of the candidate memory being checked (may not yet be stored).
    pub candidate_id: Uuid,
    /// Id of the existing memory matched, if any.
    pub matched_id: Option<Uuid>,
    /// Similarity score backing the decision.
    pub similarity: f64,
    /// Tier that fired.
    pub tier: Option<DedupTier>,
    /// Final decision.
    pub decision: DedupDecision,
    /// Whether the decision was made automatically or by a human
    /// (`mark_false_positive`).
    pub auto: bool,
    /// When this review was recorded.
    pub timestamp: DateTime<Utc>,
}
