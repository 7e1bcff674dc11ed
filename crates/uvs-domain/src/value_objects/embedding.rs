//! Fixed-dimension embedding value object.

use serde::{Deserialize, Serialize};

/// A fixed-dimension float vector representing text semantics, tagged with
/// the model that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    /// Embedding vector values.
    pub vector: Vec<f32>,
    /// Identifier of the model that generated this embedding (may be the
    /// deterministic pseudo-embedding model id).
    pub model: String,
}

impl Embedding {
    /// Declared dimensionality of this vector.
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Validate against a required dimension and finiteness.
    pub fn validate(&self, expected_dim: usize) -> Result<(), String> {
        if self.vector.len() != expected_dim {
            return Err(format!(
                "embedding has {} dimensions, expected {}",
                self.vector.len(),
                expected_dim
            ));
        }
        if self.vector.iter().any(|v| !v.is_finite()) {
            return Err("embedding contains NaN or infinite values".to_string());
        }
        Ok(())
    }
}

/// Cosine similarity normalized to `[0, 1]` so identical vectors score `1.0`
/// and orthogonal vectors score `0.0`.
pub fn cosine_similarity_unit(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    ((dot / (norm_a * norm_b)) + 1.0) / 2.0
}
