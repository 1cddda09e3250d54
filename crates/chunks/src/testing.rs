//! Deterministic fake collaborators for tests. No network, stable output.

use async_trait::async_trait;

use crate::embedder::{EmbeddingError, EmbeddingProvider};

/// Bag-of-words embedder: each word hashes to one dimension, counts are
/// accumulated and the vector normalized. Identical text yields identical
/// vectors; texts sharing words have positive cosine similarity.
pub struct FakeEmbedder {
    dimension: usize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0);
        Self { dimension }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let slot = fold_hash(word) as usize % self.dimension;
            vector[slot] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Always fails, for exercising embedding-failure propagation.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Http("fake embedder is offline".to_string()))
    }
}

// Stable across runs and platforms, unlike DefaultHasher.
fn fold_hash(word: &str) -> u64 {
    word.bytes()
        .fold(1469598103934665603u64, |h, b| {
            (h ^ b as u64).wrapping_mul(1099511628211)
        })
}
