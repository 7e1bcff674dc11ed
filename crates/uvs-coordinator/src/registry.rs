//! The provider registry: a copy-on-write set of registered providers.
//!
//! Reads (the hot path — every query fan-out walks this) never take a lock;
//! registration/enable/disable build a new `Vec` and swap it in atomically,
//! the pattern the domain layer's `ProviderDescriptor` doc comment calls
//! for in place of a `RwLock<Vec<_>>` that every query would contend on.

use arc_swap::ArcSwap;
use std::sync::Arc;
use uvs_domain::error::{Error, Result};
use uvs_domain::ports::ProviderPort;
use uvs_domain::value_objects::{ProviderDescriptor, ProviderRole};

/// One provider plus the static descriptor the coordinator advertises it
/// under.
#[derive(Clone)]
pub struct ProviderEntry {
    /// Static name/role/enabled/dimension.
    pub descriptor: ProviderDescriptor,
    /// The live handle dispatched to.
    pub port: Arc<dyn ProviderPort>,
}

/// Copy-on-write provider set. The coordinator never advertises a provider
/// before its readiness handshake (`PrimaryProvider::initialize` / the
/// equivalent on secondaries) has completed and the caller flips
/// `enabled` via [`ProviderRegistry::register`] or
/// [`ProviderRegistry::set_enabled`] — this closes the fire-and-forget
/// initialization race described in spec §9.
#[derive(Clone)]
pub struct ProviderRegistry {
    entries: Arc<ArcSwap<Vec<ProviderEntry>>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Register or replace a provider by name. Enforces at most one
    /// `Primary`-role provider at a time.
    pub fn register(&self, entry: ProviderEntry) -> Result<()> {
        if entry.descriptor.role == ProviderRole::Primary {
            let existing_primary = self
                .entries
                .load()
                .iter()
                .any(|e| e.descriptor.role == ProviderRole::Primary && e.descriptor.name != entry.descriptor.name);
            if existing_primary {
                return Err(Error::conflict(
                    "only one provider may hold role Primary at a time",
                ));
            }
        }
        self.entries.rcu(|current| {
            let mut next: Vec<ProviderEntry> = current
                .iter()
                .filter(|e| e.descriptor.name != entry.descriptor.name)
                .cloned()
                .collect();
            next.push(entry.clone());
            next
        });
        Ok(())
    }

    /// Flip a provider's `enabled` flag in place.
    pub fn set_enabled(&self, name: &str, enabled: bool) {
        self.entries.rcu(|current| {
            current
                .iter()
                .map(|e| {
                    if e.descriptor.name == name {
                        let mut e = e.clone();
                        e.descriptor.enabled = enabled;
                        e
                    } else {
                        e.clone()
                    }
                })
                .collect::<Vec<_>>()
        });
    }

    /// Snapshot of every registered entry, enabled or not.
    pub fn all(&self) -> Arc<Vec<ProviderEntry>> {
        self.entries.load_full()
    }

    /// Snapshot of enabled entries only.
    pub fn enabled(&self) -> Vec<ProviderEntry> {
        self.all().iter().filter(|e| e.descriptor.enabled).cloned().collect()
    }

    /// The single enabled primary provider, if any.
    pub fn primary(&self) -> Option<ProviderEntry> {
        self.enabled()
            .into_iter()
            .find(|e| e.descriptor.role == ProviderRole::Primary)
    }

    /// Enabled secondary providers, in registration order.
    pub fn secondaries(&self) -> Vec<ProviderEntry> {
        self.enabled()
            .into_iter()
            .filter(|e| e.descriptor.role == ProviderRole::Secondary)
            .collect()
    }

    /// Enabled providers that participate in mirror fan-out: every enabled
    /// provider whose role is not `Primary`.
    pub fn mirror_targets(&self) -> Vec<ProviderEntry> {
        self.enabled()
            .into_iter()
            .filter(|e| e.descriptor.role != ProviderRole::Primary)
            .collect()
    }

    /// Look up one enabled entry by name.
    pub fn by_name(&self, name: &str) -> Option<ProviderEntry> {
        self.enabled().into_iter().find(|e| e.descriptor.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use uvs_domain::error::Result as DomainResult;
    use uvs_domain::ports::provider_port::ProviderHit;
    use uvs_domain::value_objects::{Embedding, Filters, Memory, ProviderHealth, ProviderState};
    use uuid::Uuid;

    struct StubProvider(&'static str);

    #[async_trait]
    impl ProviderPort for StubProvider {
        fn name(&self) -> &str {
            self.0
        }
        async fn store(&self, _: &str, _: &Embedding, _: HashMap<String, serde_json::Value>) -> DomainResult<Uuid> {
            unimplemented!()
        }
        async fn query(&self, _: Option<&[f32]>, _: usize, _: f64, _: &Filters) -> DomainResult<Vec<ProviderHit>> {
            unimplemented!()
        }
        async fn get_recent(&self, _: usize, _: &Filters) -> DomainResult<Vec<Memory>> {
            unimplemented!()
        }
        async fn get_by_id(&self, _: Uuid) -> DomainResult<Option<Memory>> {
            unimplemented!()
        }
        async fn delete(&self, _: Uuid) -> DomainResult<bool> {
            unimplemented!()
        }
        async fn update_importance(&self, _: Uuid, _: f64) -> DomainResult<()> {
            unimplemented!()
        }
        async fn health(&self) -> ProviderHealth {
            ProviderHealth {
                status: ProviderState::Ready,
                detail: HashMap::new(),
            }
        }
        async fn stats(&self) -> HashMap<String, serde_json::Value> {
            HashMap::new()
        }
    }

    fn entry(name: &'static str, role: ProviderRole) -> ProviderEntry {
        ProviderEntry {
            descriptor: ProviderDescriptor {
                name: name.to_string(),
                role,
                enabled: true,
                dimension: 4,
            },
            port: Arc::new(StubProvider(name)),
        }
    }

    #[test]
    fn rejects_second_primary() {
        let registry = ProviderRegistry::new();
        registry.register(entry("p1", ProviderRole::Primary)).unwrap();
        let err = registry.register(entry("p2", ProviderRole::Primary)).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn disabled_providers_excluded_from_dispatch_sets() {
        let registry = ProviderRegistry::new();
        registry.register(entry("p1", ProviderRole::Primary)).unwrap();
        registry.register(entry("s1", ProviderRole::Secondary)).unwrap();
        registry.set_enabled("s1", false);
        assert_eq!(registry.secondaries().len(), 0);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn mirror_targets_excludes_primary() {
        let registry = ProviderRegistry::new();
        registry.register(entry("p1", ProviderRole::Primary)).unwrap();
        registry.register(entry("s1", ProviderRole::Secondary)).unwrap();
        registry.register(entry("g1", ProviderRole::Auxiliary)).unwrap();
        let names: Vec<_> = registry.mirror_targets().into_iter().map(|e| e.descriptor.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"s1".to_string()));
        assert!(names.contains(&"g1".to_string()));
    }
}
