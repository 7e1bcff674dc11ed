//! Embedding model contract consumed by the embedding pipeline's model
//! chain.

use crate::error::Result;
use crate::value_objects::Embedding;
use async_trait::async_trait;

/// One entry in the embedding pipeline's fallback chain. Implementations
/// range from a remote API client to the deterministic pseudo-embedding
/// fallback; the pipeline tries them in declared order and takes the first
/// success.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Stable model identifier, stamped onto every `Embedding` it produces.
    fn model_id(&self) -> &str;

    /// Dimensionality this model advertises.
    fn dimensions(&self) -> usize;

    /// Embed a single normalized text. Implementations should not attempt
    /// their own retries; the pipeline owns fallback policy.
    async fn embed(&self, normalized_text: &str) -> Result<Embedding>;
}
