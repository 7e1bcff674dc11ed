//! Pre-store three-tier deduplication.
//!
//! Runs in the coordinator before the primary write so `mode=off` is free
//! and rule-tier decisions never depend on database triggers.

pub mod probe;
pub mod rules;
pub mod service;

pub use probe::{ProbeHit, VectorProbe};
pub use rules::{DedupRule, RuleContext};
pub use service::{DedupService, DedupServiceConfig};
