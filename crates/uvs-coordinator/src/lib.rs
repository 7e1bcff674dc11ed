//! The Unified Store coordinator: wires the embedding pipeline, the dedup
//! service and a set of [`uvs_domain::ports::ProviderPort`] backends into
//! the store/query/get/delete/admin operations the outer layers call.

pub mod config;
pub mod coordinator;
pub mod graph;
pub mod mirror;
pub mod probe;
pub mod registry;

pub use config::{UnifiedStoreConfig, WriteFailoverMode};
pub use coordinator::{QueryEnvelope, QueryRequest, UnifiedStoreCoordinator};
pub use graph::{GraphCollaborator, GraphEvent, GraphNotifier};
pub use mirror::DropOldestQueue;
pub use probe::PrimaryVectorProbe;
pub use registry::{ProviderEntry, ProviderRegistry};
