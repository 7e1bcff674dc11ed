//! Cross-cutting instrumentation hooks. The coordinator invokes these
//! around each public op and each provider call without tangling business
//! logic; providers accept an optional callback of their own via the same
//! trait.

use std::sync::Arc;
use std::time::Duration;

/// A span/counter sink the coordinator and providers call into. Default
/// implementation is a no-op; tests use a counting double.
pub trait InstrumentationHook: Send + Sync {
    /// Called when a public operation starts.
    fn op_started(&self, _op: &str) {}

    /// Called when a public operation finishes, successfully or not.
    fn op_finished(&self, _op: &str, _duration: Duration, _success: bool) {}

    /// Called when a provider-level call completes.
    fn provider_call(&self, _provider: &str, _op: &str, _success: bool) {}

    /// Called once per counter increment (cache hit/miss, mirror drop, ...).
    fn counter(&self, _name: &str, _delta: u64) {}
}

/// No-op hook, the default when no instrumentation is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl InstrumentationHook for NoopHook {}

/// Shared handle type most call sites hold.
pub type HookHandle = Arc<dyn InstrumentationHook>;

/// Build the default no-op hook handle.
pub fn noop_hook() -> HookHandle {
    Arc::new(NoopHook)
}
