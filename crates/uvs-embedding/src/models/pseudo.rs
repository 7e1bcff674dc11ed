//! Deterministic pseudo-embedding fallback.
//!
//! Exists so ingestion never blocks permanently on model outages. Produces
//! a seeded hash-to-unit-vector embedding and is always tagged in metadata
//! by the pipeline so callers can later reprocess with a real model.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uvs_domain::error::Result;
use uvs_domain::ports::EmbeddingModel;
use uvs_domain::value_objects::Embedding;

/// The last-resort model in the chain: deterministic, local, always
/// succeeds.
pub struct PseudoEmbeddingModel {
    dimensions: usize,
}

impl PseudoEmbeddingModel {
    /// Build a pseudo model producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingModel for PseudoEmbeddingModel {
    fn model_id(&self) -> &str {
        "pseudo-hash-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, normalized_text: &str) -> Result<Embedding> {
        Ok(Embedding {
            vector: hash_to_unit_vector(normalized_text, self.dimensions),
            model: self.model_id().to_string(),
        })
    }
}

/// Seeded hash-to-unit-vector: repeatedly hash a running seed to fill the
/// vector, then L2-normalize. Deterministic for a given `(text, dim)`.
fn hash_to_unit_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dim);
    let mut seed = text.as_bytes().to_vec();
    while vector.len() < dim {
        let digest = Sha256::digest(&seed);
        for chunk in digest.chunks(4) {
            if vector.len() >= dim {
                break;
            }
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            let as_u32 = u32::from_le_bytes(buf);
            // Map to [-1, 1].
            let value = (as_u32 as f64 / u32::MAX as f64) * 2.0 - 1.0;
            vector.push(value as f32);
        }
        seed = digest.to_vec();
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
