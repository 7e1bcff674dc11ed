//! The three-tier deduplication service.

use crate::probe::VectorProbe;
use crate::rules::{run_rules, DedupRule, RuleContext};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;
use uvs_domain::constants::{
    DEFAULT_DEDUP_SIMILARITY_THRESHOLD, DEFAULT_DEDUP_STRICT_SIMILARITY_THRESHOLD,
    DEFAULT_DEDUP_TOP_K,
};
use uvs_domain::error::Result;
use uvs_domain::value_objects::memory::ContentHash;
use uvs_domain::value_objects::{DedupDecision, DedupMode, DedupOutcome, DedupReview, DedupTier};

/// How many [`DedupReview`] records to retain in memory before the oldest
/// are dropped.
const DEFAULT_REVIEW_RETENTION: usize = 10_000;

fn mode_to_u8(mode: DedupMode) -> u8 {
    match mode {
        DedupMode::Off => 0,
        DedupMode::LogOnly => 1,
        DedupMode::Active => 2,
        DedupMode::Strict => 3,
    }
}

fn u8_to_mode(v: u8) -> DedupMode {
    match v {
        0 => DedupMode::Off,
        1 => DedupMode::LogOnly,
        3 => DedupMode::Strict,
        _ => DedupMode::Active,
    }
}

/// Configuration for [`DedupService::new`].
#[derive(Debug, Clone)]
pub struct DedupServiceConfig {
    /// Starting mode.
    pub mode: DedupMode,
    /// When `true`, only the hash tier ever runs, regardless of `mode`.
    pub exact_match_only: bool,
    /// Vector tier candidate count (`K`).
    pub top_k: usize,
    /// Similarity threshold used in `active` mode.
    pub similarity_threshold_active: f64,
    /// Similarity threshold used in `strict` mode.
    pub similarity_threshold_strict: f64,
    /// Rule-tier window for `SameUserWithinWindow`-style rules.
    pub rule_window_secs: i64,
}

impl Default for DedupServiceConfig {
    fn default() -> Self {
        Self {
            mode: DedupMode::Active,
            exact_match_only: false,
            top_k: DEFAULT_DEDUP_TOP_K,
            similarity_threshold_active: DEFAULT_DEDUP_SIMILARITY_THRESHOLD,
            similarity_threshold_strict: DEFAULT_DEDUP_STRICT_SIMILARITY_THRESHOLD,
            rule_window_secs: 300,
        }
    }
}

/// The dedup pipeline: hash tier → vector tier → rule tier, gated by mode.
pub struct DedupService {
    mode: AtomicU8,
    exact_match_only: bool,
    top_k: usize,
    similarity_threshold_active: f64,
    similarity_threshold_strict: AtomicF64Bits,
    rules: Vec<Box<dyn DedupRule>>,
    probe: Arc<dyn VectorProbe>,
    hash_index: DashMap<String, Uuid>,
    id_to_hash: DashMap<Uuid, String>,
    reviews: RwLock<VecDeque<DedupReview>>,
}

/// Lock-free storage for an `f64` threshold that `mark_false_positive` may
/// nudge upward at runtime.
struct AtomicF64Bits(std::sync::atomic::AtomicU64);

impl AtomicF64Bits {
    fn new(v: f64) -> Self {
        Self(std::sync::atomic::AtomicU64::new(v.to_bits()))
    }
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::SeqCst);
    }
}

impl DedupService {
    /// Build a dedup service with a default rule set
    /// (`SameUserWithinWindow` + `DifferentConversationNeverDuplicate`).
    pub fn new(probe: Arc<dyn VectorProbe>, config: DedupServiceConfig) -> Self {
        let rules: Vec<Box<dyn DedupRule>> = vec![
            Box::new(crate::rules::SameUserWithinWindow {
                window_secs: config.rule_window_secs,
            }),
            Box::new(crate::rules::DifferentConversationNeverDuplicate),
        ];
        Self::with_rules(probe, config, rules)
    }

    /// Build a dedup service with a caller-supplied rule set, for tests or
    /// deployments with custom business predicates.
    pub fn with_rules(
        probe: Arc<dyn VectorProbe>,
        config: DedupServiceConfig,
        rules: Vec<Box<dyn DedupRule>>,
    ) -> Self {
        Self {
            mode: AtomicU8::new(mode_to_u8(config.mode)),
            exact_match_only: config.exact_match_only,
            top_k: config.top_k,
            similarity_threshold_active: config.similarity_threshold_active,
            similarity_threshold_strict: AtomicF64Bits::new(config.similarity_threshold_strict),
            rules,
            probe,
            hash_index: DashMap::new(),
            id_to_hash: DashMap::new(),
            reviews: RwLock::new(VecDeque::new()),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> DedupMode {
        u8_to_mode(self.mode.load(Ordering::SeqCst))
    }

    /// Admin op: `set_dedup_mode`.
    pub fn set_mode(&self, mode: DedupMode) {
        self.mode.store(mode_to_u8(mode), Ordering::SeqCst);
    }

    /// Record the content hash for a newly stored memory, run as an
    /// auto-hash hook at insert. Call this after a successful primary
    /// write, with the already-normalized content.
    pub fn record_hash(&self, normalized_content: &str, id: Uuid) {
        let hash = ContentHash::of(normalized_content).to_hex();
        self.hash_index.insert(hash.clone(), id);
        self.id_to_hash.insert(id, hash);
    }

    /// Remove the hash association for a deleted memory, cascading the
    /// cleanup to this dependent index.
    pub fn remove_hash(&self, id: Uuid) {
        if let Some((_, hash)) = self.id_to_hash.remove(&id) {
            self.hash_index.remove(&hash);
        }
    }

    /// Run the dedup pipeline for a new candidate.
    ///
    /// `off` never probes anything (≤1ms contract). `log_only` runs the
    /// full pipeline but always returns `is_duplicate: false` so the write
    /// proceeds. `active`/`strict` can block the write by returning
    /// `is_duplicate: true`.
    pub async fn check(
        &self,
        normalized_candidate_content: &str,
        candidate_embedding: &[f32],
        candidate_metadata: &HashMap<String, Value>,
    ) -> Result<DedupOutcome> {
        let mode = self.mode();
        if mode == DedupMode::Off {
            return Ok(DedupOutcome::unique());
        }

        let outcome = self
            .run_pipeline(mode, normalized_candidate_content, candidate_embedding, candidate_metadata)
            .await?;

        let blocks_write = matches!(mode, DedupMode::Active | DedupMode::Strict) && outcome.is_duplicate;

        if outcome.tier.is_some() {
            let decision = if blocks_write {
                DedupDecision::Duplicate
            } else if outcome.is_duplicate {
                // log_only: the pipeline found a match but mode doesn't block.
                DedupDecision::Duplicate
            } else {
                DedupDecision::Unique
            };
            self.append_review(DedupReview {
                candidate_id: Uuid::new_v4(),
                matched_id: outcome.canonical_id,
                similarity: outcome.score,
                tier: outcome.tier,
                decision,
                auto: true,
                timestamp: Utc::now(),
            })
            .await;
        }

        if mode == DedupMode::LogOnly {
            return Ok(DedupOutcome {
                is_duplicate: false,
                ..outcome
            });
        }

        Ok(outcome)
    }

    async fn run_pipeline(
        &self,
        mode: DedupMode,
        normalized_candidate_content: &str,
        candidate_embedding: &[f32],
        candidate_metadata: &HashMap<String, Value>,
    ) -> Result<DedupOutcome> {
        // Tier 1: exact hash.
        let hash = ContentHash::of(normalized_candidate_content).to_hex();
        if let Some(existing) = self.hash_index.get(&hash) {
            return Ok(DedupOutcome {
                is_duplicate: true,
                canonical_id: Some(*existing),
                tier: Some(DedupTier::Hash),
                score: 1.0,
                reason: "exact content hash match".to_string(),
            });
        }

        if self.exact_match_only {
            return Ok(DedupOutcome::unique());
        }

        // Tier 2: vector similarity.
        let threshold = match mode {
            DedupMode::Strict => self.similarity_threshold_strict.load(),
            _ => self.similarity_threshold_active,
        };
        let candidates = self.probe.similar(candidate_embedding, self.top_k, threshold).await?;

        if let Some(best) = candidates.iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) {
            if mode == DedupMode::Strict {
                // All tiers must concur-or-abstain: rerun the rule tier
                // against the top vector match and require it not to veto.
                let now = Utc::now();
                let ctx = RuleContext {
                    candidate_content: normalized_candidate_content,
                    candidate_metadata,
                    now,
                    existing_id: best.id,
                    existing_content: &best.content,
                    existing_metadata: &best.metadata,
                    existing_created_at: best.created_at,
                };
                if let Some((false, _)) = run_rules(&self.rules, &ctx) {
                    return Ok(DedupOutcome::unique());
                }
            }

            return Ok(DedupOutcome {
                is_duplicate: true,
                canonical_id: Some(best.id),
                tier: Some(DedupTier::Vector),
                score: best.score,
                reason: format!("vector similarity {:.4} >= threshold {:.4}", best.score, threshold),
            });
        }

        // Tier 3: business rules. Rules need a concrete existing memory to
        // compare against; without a vector-tier candidate there is nothing
        // to evaluate them against, so the rule tier only ever fires in
        // combination with a (sub-threshold) vector hit surfaced here.
        let weak_candidates = self.probe.similar(candidate_embedding, self.top_k, 0.0).await?;
        let now = Utc::now();
        for existing in &weak_candidates {
            let ctx = RuleContext {
                candidate_content: normalized_candidate_content,
                candidate_metadata,
                now,
                existing_id: existing.id,
                existing_content: &existing.content,
                existing_metadata: &existing.metadata,
                existing_created_at: existing.created_at,
            };
            if let Some((true, _)) = run_rules(&self.rules, &ctx) {
                return Ok(DedupOutcome {
                    is_duplicate: true,
                    canonical_id: Some(existing.id),
                    tier: Some(DedupTier::Rule),
                    score: existing.score,
                    reason: "business rule matched".to_string(),
                });
            }
        }

        Ok(DedupOutcome::unique())
    }

    /// Admin op: `mark_false_positive`.
    ///
    /// Appends a `decision=unique` review, evicts the hash association for
    /// `reported_id` if present, and nudges the strict-mode threshold
    /// upward slightly so the same near-duplicate pair is less likely to
    /// misfire again.
    pub async fn mark_false_positive(&self, reported_id: Uuid, actual_id: Uuid) {
        warn!(%reported_id, %actual_id, "dedup false positive reported");
        self.remove_hash(reported_id);
        self.append_review(DedupReview {
            candidate_id: reported_id,
            matched_id: Some(actual_id),
            similarity: 0.0,
            tier: None,
            decision: DedupDecision::Unique,
            auto: false,
            timestamp: Utc::now(),
        })
        .await;

        let current = self.similarity_threshold_strict.load();
        let nudged = (current + 0.01).min(0.999);
        self.similarity_threshold_strict.store(nudged);
        info!(old = current, new = nudged, "nudged strict dedup threshold upward");
    }

    /// Snapshot of recorded reviews, most recent last.
    pub async fn reviews_snapshot(&self) -> Vec<DedupReview> {
        self.reviews.read().await.iter().cloned().collect()
    }

    async fn append_review(&self, review: DedupReview) {
        let mut reviews = self.reviews.write().await;
        reviews.push_back(review);
        while reviews.len() > DEFAULT_REVIEW_RETENTION {
            reviews.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeHit;
    use std::sync::Mutex;
    use uvs_domain::normalize::normalize;

    struct FakeProbe {
        hits: Mutex<Vec<ProbeHit>>,
    }

    #[async_trait::async_trait]
    impl VectorProbe for FakeProbe {
        async fn similar(
            &self,
            _embedding: &[f32],
            limit: usize,
            min_similarity: f64,
        ) -> Result<Vec<ProbeHit>> {
            let hits = self.hits.lock().unwrap();
            Ok(hits
                .iter()
                .filter(|h| h.score >= min_similarity)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn off_mode_never_probes() {
        let probe = Arc::new(FakeProbe { hits: Mutex::new(vec![]) });
        let service = DedupService::new(
            probe,
            DedupServiceConfig {
                mode: DedupMode::Off,
                ..Default::default()
            },
        );
        let outcome = service
            .check(&normalize("hello"), &[0.1, 0.2], &HashMap::new())
            .await
            .unwrap();
        assert!(!outcome.is_duplicate);
    }

    #[tokio::test]
    async fn exact_hash_duplicate_in_active_mode() {
        let probe = Arc::new(FakeProbe { hits: Mutex::new(vec![]) });
        let service = DedupService::new(probe, DedupServiceConfig::default());
        let id = Uuid::new_v4();
        let normalized = normalize("hello world");
        service.record_hash(&normalized, id);

        let outcome = service
            .check(&normalized, &[0.1, 0.2], &HashMap::new())
            .await
            .unwrap();
        assert!(outcome.is_duplicate);
        assert_eq!(outcome.canonical_id, Some(id));
        assert_eq!(outcome.tier, Some(DedupTier::Hash));
    }

    #[tokio::test]
    async fn log_only_never_blocks_but_still_records() {
        let probe = Arc::new(FakeProbe { hits: Mutex::new(vec![]) });
        let service = DedupService::new(
            probe,
            DedupServiceConfig {
                mode: DedupMode::LogOnly,
                ..Default::default()
            },
        );
        let id = Uuid::new_v4();
        let normalized = normalize("hello world");
        service.record_hash(&normalized, id);

        let outcome = service
            .check(&normalized, &[0.1, 0.2], &HashMap::new())
            .await
            .unwrap();
        assert!(!outcome.is_duplicate);
        assert_eq!(service.reviews_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn strict_mode_vector_tier_fires_below_active_threshold() {
        let existing_id = Uuid::new_v4();
        let probe = Arc::new(FakeProbe {
            hits: Mutex::new(vec![ProbeHit {
                id: existing_id,
                content: "The quick brown fox".to_string(),
                metadata: HashMap::new(),
                created_at: Utc::now(),
                score: 0.93,
            }]),
        });
        let service = DedupService::new(
            probe,
            DedupServiceConfig {
                mode: DedupMode::Strict,
                ..Default::default()
            },
        );
        let outcome = service
            .check(&normalize("The quick brown foxes"), &[0.1, 0.2], &HashMap::new())
            .await
            .unwrap();
        assert!(outcome.is_duplicate);
        assert_eq!(outcome.canonical_id, Some(existing_id));
        assert_eq!(outcome.tier, Some(DedupTier::Vector));
    }

    #[tokio::test]
    async fn mark_false_positive_clears_hash_and_records_review() {
        let probe = Arc::new(FakeProbe { hits: Mutex::new(vec![]) });
        let service = DedupService::new(probe, DedupServiceConfig::default());
        let id = Uuid::new_v4();
        let normalized = normalize("hello world");
        service.record_hash(&normalized, id);

        service.mark_false_positive(id, Uuid::new_v4()).await;

        let outcome = service
            .check(&normalized, &[0.1, 0.2], &HashMap::new())
            .await
            .unwrap();
        assert!(!outcome.is_duplicate);
    }
}
