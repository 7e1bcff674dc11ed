//! Rule tier: ordered, data-driven business predicates.
//!
//! The engine only orchestrates; rules themselves decide, the same way a
//! hybrid search engine combines independently scored signals rather than
//! hard-coding fusion logic into the caller.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Everything a rule needs to decide whether a candidate duplicates an
/// existing memory.
pub struct RuleContext<'a> {
    /// Normalized candidate content.
    pub candidate_content: &'a str,
    /// Candidate metadata (e.g. `user_id`, `conversation_id`).
    pub candidate_metadata: &'a HashMap<String, Value>,
    /// When the candidate is being evaluated.
    pub now: DateTime<Utc>,
    /// Existing memory under comparison.
    pub existing_id: Uuid,
    /// Existing memory's content.
    pub existing_content: &'a str,
    /// Existing memory's metadata.
    pub existing_metadata: &'a HashMap<String, Value>,
    /// Existing memory's creation time.
    pub existing_created_at: DateTime<Utc>,
}

/// A single business predicate in the rule tier.
///
/// Returning `Some(true)` means "this rule asserts duplicate",
/// `Some(false)` means "this rule asserts unique" (and, depending on the
/// rule, may veto other rules — e.g. "different conversation_id is never a
/// duplicate"), and `None` means "this rule has no opinion".
pub trait DedupRule: Send + Sync {
    /// Human-readable name used in review records.
    fn name(&self) -> &str;

    /// Evaluate the rule against a context.
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<bool>;
}

/// "Same content and same `user_id` within `Δt` is a duplicate."
pub struct SameUserWithinWindow {
    /// Window size in seconds.
    pub window_secs: i64,
}

impl DedupRule for SameUserWithinWindow {
    fn name(&self) -> &str {
        "same_user_within_window"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<bool> {
        let same_content = ctx.candidate_content == ctx.existing_content;
        let same_user = ctx.candidate_metadata.get("user_id").is_some()
            && ctx.candidate_metadata.get("user_id") == ctx.existing_metadata.get("user_id");
        if !same_content || !same_user {
            return None;
        }
        let delta = (ctx.now - ctx.existing_created_at).num_seconds().abs();
        Some(delta <= self.window_secs)
    }
}

/// "Different `conversation_id` is never a duplicate." A veto rule: when it
/// fires it asserts uniqueness regardless of other signals.
pub struct DifferentConversationNeverDuplicate;

impl DedupRule for DifferentConversationNeverDuplicate {
    fn name(&self) -> &str {
        "different_conversation_never_duplicate"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<bool> {
        match (
            ctx.candidate_metadata.get("conversation_id"),
            ctx.existing_metadata.get("conversation_id"),
        ) {
            (Some(a), Some(b)) if a != b => Some(false),
            _ => None,
        }
    }
}

/// Run the ordered rule set against a context. A veto (`Some(false)`) from
/// any rule wins outright; otherwise the first `Some(true)` wins; if no
/// rule has an opinion, returns `None`.
pub fn run_rules(rules: &[Box<dyn DedupRule>], ctx: &RuleContext<'_>) -> Option<(bool, &'static str)> {
    let mut asserted_duplicate = false;
    for rule in rules {
        match rule.evaluate(ctx) {
            Some(false) => return Some((false, "veto")),
            Some(true) => asserted_duplicate = true,
            None => {}
        }
    }
    if asserted_duplicate {
        Some((true, "rule"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx<'a>(
        candidate_content: &'a str,
        candidate_metadata: &'a HashMap<String, Value>,
        existing_content: &'a str,
        existing_metadata: &'a HashMap<String, Value>,
        existing_created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RuleContext<'a> {
        RuleContext {
            candidate_content,
            candidate_metadata,
            now,
            existing_id: Uuid::new_v4(),
            existing_content,
            existing_metadata,
            existing_created_at,
        }
    }

    #[test]
    fn same_user_within_window_fires() {
        let rule = SameUserWithinWindow { window_secs: 60 };
        let mut meta = HashMap::new();
        meta.insert("user_id".to_string(), Value::String("u1".into()));
        let now = Utc::now();
        let c = ctx("hi", &meta, "hi", &meta, now, now);
        assert_eq!(rule.evaluate(&c), Some(true));
    }

    #[test]
    fn different_conversation_vetoes() {
        let rule = DifferentConversationNeverDuplicate;
        let mut a = HashMap::new();
        a.insert("conversation_id".to_string(), Value::String("c1".into()));
        let mut b = HashMap::new();
        b.insert("conversation_id".to_string(), Value::String("c2".into()));
        let now = Utc::now();
        let c = ctx("hi", &a, "hi", &b, now, now);
        assert_eq!(rule.evaluate(&c), Some(false));
    }
}
