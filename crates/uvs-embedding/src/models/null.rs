//! Test double: a model that always fails, used to exercise the fallback
//! chain and to assert the empty-query path never calls into the pipeline
//!.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use uvs_domain::error::{Error, Result};
use uvs_domain::ports::EmbeddingModel;
use uvs_domain::value_objects::Embedding;

/// Always returns [`Error::EmbeddingFailed`]. Useful as a first link in a
/// fallback chain to exercise the "failures are logged, next is tried"
/// behavior.
#[derive(Default)]
pub struct FailingEmbeddingModel {
    dimensions: usize,
}

impl FailingEmbeddingModel {
    /// Build a model that always fails, advertising `dimensions`.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingModel for FailingEmbeddingModel {
    fn model_id(&self) -> &str {
        "failing-test-model"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, _normalized_text: &str) -> Result<Embedding> {
        Err(Error::embedding_failed(
            "failing-test-model always fails by design",
        ))
    }
}

/// Counts how many times `embed` was invoked, then delegates to an inner
/// model. Used by coordinator tests to assert the empty-query path never
/// touches the embedding pipeline.
pub struct CountingEmbeddingModel<M: EmbeddingModel> {
    inner: M,
    calls: AtomicU64,
}

impl<M: EmbeddingModel> CountingEmbeddingModel<M> {
    /// Wrap `inner`, starting the call counter at zero.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of `embed` calls observed so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: EmbeddingModel> EmbeddingModel for CountingEmbeddingModel<M> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, normalized_text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(normalized_text).await
    }
}
