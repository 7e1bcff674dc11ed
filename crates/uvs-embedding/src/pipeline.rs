//! Text → fixed-dim vector, with model fallback chain and cache insert.

use crate::cache::EmbeddingCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uvs_domain::error::{Error, Result};
use uvs_domain::normalize::normalize;
use uvs_domain::ports::EmbeddingModel;
use uvs_domain::value_objects::Embedding;

/// Configuration for building an [`EmbeddingPipeline`].
#[derive(Debug, Clone)]
pub struct EmbeddingPipelineConfig {
    /// Global embedding dimension all models must produce.
    pub dimension: usize,
    /// Embedding cache capacity.
    pub cache_size: u64,
    /// Embedding cache time-to-live.
    pub cache_ttl: Duration,
}

impl Default for EmbeddingPipelineConfig {
    fn default() -> Self {
        Self {
            dimension: uvs_domain::constants::DEFAULT_EMBEDDING_DIM,
            cache_size: uvs_domain::constants::DEFAULT_EMBEDDING_CACHE_SIZE,
            cache_ttl: Duration::from_secs(uvs_domain::constants::DEFAULT_EMBEDDING_CACHE_TTL_SECS),
        }
    }
}

/// The embedding pipeline: normalize → cache → model chain → validate →
/// cache insert.
pub struct EmbeddingPipeline {
    chain: Vec<Arc<dyn EmbeddingModel>>,
    cache: EmbeddingCache,
    dimension: usize,
}

impl EmbeddingPipeline {
    /// Build a pipeline from an ordered model chain. The first model in
    /// `chain` is tried first; `chain` should end with a model that cannot
    /// fail (e.g. [`crate::models::PseudoEmbeddingModel`]) so ingestion
    /// never blocks permanently on outages.
    pub fn new(chain: Vec<Arc<dyn EmbeddingModel>>, config: EmbeddingPipelineConfig) -> Self {
        Self {
            chain,
            cache: EmbeddingCache::new(config.cache_size, config.cache_ttl),
            dimension: config.dimension,
        }
    }

    /// Declared dimension every embedding from this pipeline must have.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Direct access to the cache, used by the periodic cache-eviction task.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Embed `text`, trying the cache first and then the model chain in
    /// order. Returns the embedding plus whether it came from the
    /// deterministic pseudo-embedding fallback (callers tag memory metadata
    /// with this).
    pub async fn embed(&self, text: &str) -> Result<(Embedding, bool)> {
        let normalized = normalize(text);

        // Tier 0: cache, keyed per the *first* chain entry's model id so a
        // cache hit always reflects the preferred model, not whichever one
        // happened to answer last time.
        let preferred_model_id = self
            .chain
            .first()
            .map(|m| m.model_id().to_string())
            .unwrap_or_default();
        if let Some(cached) = self.cache.get(&normalized, &preferred_model_id).await {
            let is_pseudo = is_pseudo_model_id(&cached.model);
            return Ok((cached, is_pseudo));
        }

        let mut last_err: Option<Error> = None;
        for model in &self.chain {
            match model.embed(&normalized).await {
                Ok(embedding) => {
                    if let Err(reason) = embedding.validate(self.dimension) {
                        last_err = Some(Error::invalid_embedding(format!(
                            "model '{}' produced an invalid embedding: {reason}",
                            model.model_id()
                        )));
                        warn!(model = model.model_id(), reason, "embedding model produced invalid vector");
                        continue;
                    }
                    self.cache
                        .insert(&normalized, &preferred_model_id, embedding.clone())
                        .await;
                    let is_pseudo = is_pseudo_model_id(model.model_id());
                    return Ok((embedding, is_pseudo));
                }
                Err(err) => {
                    warn!(model = model.model_id(), error = %err, "embedding model failed, trying next");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::embedding_failed("no embedding models configured")))
    }
}

/// Whether a model id identifies the deterministic pseudo-embedding
/// fallback.
pub fn is_pseudo_model_id(model_id: &str) -> bool {
    model_id.starts_with("pseudo-")
}
