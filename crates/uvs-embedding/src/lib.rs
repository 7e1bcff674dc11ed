//! The embedding pipeline: text → fixed-dim vector, with model
//! fallback chain and in-memory cache.

pub mod cache;
pub mod models;
pub mod pipeline;

pub use cache::EmbeddingCache;
pub use pipeline::{is_pseudo_model_id, EmbeddingPipeline, EmbeddingPipelineConfig};
