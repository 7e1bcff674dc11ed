//! Adapts the registry's primary provider into the minimal [`VectorProbe`]
//! seam the dedup service's vector tier needs, so `uvs-dedup` never has to
//! depend on `uvs-providers` or the coordinator's registry type.

use crate::registry::ProviderRegistry;
use async_trait::async_trait;
use uvs_dedup::{ProbeHit, VectorProbe};
use uvs_domain::error::Result;
use uvs_domain::value_objects::Filters;

/// Queries the currently-registered primary provider, if any, translating
/// an empty registry into an empty candidate set rather than an error —
/// dedup probing against a not-yet-wired store should never itself block
/// the caller.
pub struct PrimaryVectorProbe {
    registry: ProviderRegistry,
}

impl PrimaryVectorProbe {
    /// Wrap a registry handle.
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl VectorProbe for PrimaryVectorProbe {
    async fn similar(&self, embedding: &[f32], limit: usize, min_similarity: f64) -> Result<Vec<ProbeHit>> {
        let Some(primary) = self.registry.primary() else {
            return Ok(Vec::new());
        };
        let hits = primary
            .port
            .query(Some(embedding), limit, min_similarity, &Filters::new())
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| ProbeHit {
                id: hit.memory.id,
                content: hit.memory.content,
                metadata: hit.memory.metadata,
                created_at: hit.memory.created_at,
                score: hit.score,
            })
            .collect())
    }
}
