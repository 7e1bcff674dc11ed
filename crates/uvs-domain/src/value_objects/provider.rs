//! Provider descriptor and health/lifecycle state.

use serde::{Deserialize, Serialize};

/// Role a provider plays in the coordinator's provider set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    /// The one authoritative backend for writes. Exactly one may hold this
    /// role at a time.
    Primary,
    /// A best-effort replica usable for reads when primary is degraded.
    Secondary,
    /// A consumer that derives data from memories but never serves the
    /// query path (e.g. a knowledge-graph collaborator).
    Auxiliary,
}

/// Static description of a provider registered with the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable provider name, used in `providers_used`/`providers_failed`.
    pub name: String,
    /// Role this provider plays.
    pub role: ProviderRole,
    /// Whether the provider currently participates in dispatch.
    pub enabled: bool,
    /// Declared embedding dimension; must agree with the coordinator's
    /// global `embedding_dim`.
    pub dimension: usize,
}

/// Lifecycle states a provider moves through.
///
/// The coordinator never advertises a provider as usable before it reaches
/// `Ready`; this closes the fire-and-forget initialization race where a
/// provider accepted writes before it had finished opening its backing
/// connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// Constructed but not yet asked to initialize.
    #[default]
    Uninitialized,
    /// Initialization in flight (pool opening, schema verification, ...).
    Initializing,
    /// Healthy and serving traffic.
    Ready,
    /// Reachable but has failed enough consecutive health checks to be
    /// routed around for reads.
    Degraded,
    /// Shut down; no further operations should be issued.
    Shutdown,
}

impl ProviderState {
    /// Whether this state permits the provider to be advertised as
    /// `enabled` and receive traffic at all.
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

/// Health summary returned by a provider's `health` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Current lifecycle state.
    pub status: ProviderState,
    /// Free-form diagnostic details (e.g. connection counts, last error).
    pub detail: std::collections::HashMap<String, serde_json::Value>,
}
