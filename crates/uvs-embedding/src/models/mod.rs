//! Embedding model implementations and test doubles.
//!
//! Real remote-API model adapters (OpenAI/Ollama/VoyageAI-shaped clients)
//! are injected by the embedder of this crate through [`uvs_domain::ports::EmbeddingModel`];
//! only the local, dependency-free models live here.

pub mod null;
pub mod pseudo;

pub use null::{CountingEmbeddingModel, FailingEmbeddingModel};
pub use pseudo::PseudoEmbeddingModel;
