//! Embedding model boundary.
//!
//! The cache treats embeddings as opaque payloads. This module defines the
//! [`EmbeddingModel`] seam the serving loop calls on a cache miss, a
//! deterministic [`ProjectionModel`] implementation, and the distance
//! functions used to audit cached embeddings against fresh ones.
//!
//! # Components
//!
//! - `projection`: seeded linear projection + mean pooling + sigmoid head.
//! - `distance`: cosine and L2 distances between embeddings.

pub mod distance;
pub mod projection;

pub use distance::{cosine_distance, l2_distance};
pub use projection::ProjectionModel;

/// A pooled embedding produced by [`EmbeddingModel::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The expensive computation the cache sits in front of.
///
/// Implementations must be deterministic for identical input and free of
/// side effects. Callers guarantee a non-empty matrix whose rows are all
/// [`input_dim`](EmbeddingModel::input_dim) wide.
pub trait EmbeddingModel: Send + Sync {
    /// Width every feature row must have.
    fn input_dim(&self) -> usize;

    /// Turn a feature matrix into a pooled embedding.
    fn encode(&self, features: &[Vec<f32>]) -> Embedding;

    /// Score an embedding; the result lies in `[0, 1]`.
    fn predict(&self, embedding: &Embedding) -> f32;
}
