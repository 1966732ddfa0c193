// Deterministic projection model - stands in for the trained encoder and head

use crate::config::ModelConfig;
use crate::encoder::{Embedding, EmbeddingModel};
use crate::error::{Result, ServiceError};
use sha2::{Digest, Sha256};

/// Encoder: per-row `tanh(W x)`, mean-pooled over rows. Head: `sigmoid(h . w + b)`.
///
/// Weights are expanded from the seed with SHA-256, so two instances with
/// the same config produce bit-identical outputs.
#[derive(Debug, Clone)]
pub struct ProjectionModel {
    input_dim: usize,
    embedding_dim: usize,
    /// Row-major `embedding_dim x input_dim`
    weights: Vec<f32>,
    head: Vec<f32>,
    bias: f32,
}

impl ProjectionModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        if config.input_dim == 0 || config.embedding_dim == 0 {
            return Err(ServiceError::Config(
                "model input_dim and embedding_dim must be positive".to_string(),
            ));
        }

        let encoder_scale = 1.0 / (config.input_dim as f32).sqrt();
        let head_scale = 1.0 / (config.embedding_dim as f32).sqrt();

        let weights = expand_weights(config.seed, b"encoder", config.input_dim * config.embedding_dim)
            .into_iter()
            .map(|w| w * encoder_scale)
            .collect();
        let head = expand_weights(config.seed, b"head", config.embedding_dim)
            .into_iter()
            .map(|w| w * head_scale)
            .collect();
        let bias = expand_weights(config.seed, b"bias", 1)[0] * head_scale;

        Ok(Self {
            input_dim: config.input_dim,
            embedding_dim: config.embedding_dim,
            weights,
            head,
            bias,
        })
    }
}

impl EmbeddingModel for ProjectionModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn encode(&self, features: &[Vec<f32>]) -> Embedding {
        let mut pooled = vec![0.0f32; self.embedding_dim];
        if features.is_empty() {
            return Embedding::new(pooled);
        }

        for row in features {
            for (out, weights) in pooled.iter_mut().zip(self.weights.chunks_exact(self.input_dim)) {
                let activation: f32 = weights.iter().zip(row).map(|(w, x)| w * x).sum();
                *out += activation.tanh();
            }
        }

        let rows = features.len() as f32;
        pooled.iter_mut().for_each(|v| *v /= rows);
        Embedding::new(pooled)
    }

    fn predict(&self, embedding: &Embedding) -> f32 {
        let logit: f32 = self
            .head
            .iter()
            .zip(embedding.as_slice())
            .map(|(w, h)| w * h)
            .sum::<f32>()
            + self.bias;
        1.0 / (1.0 + (-logit).exp())
    }
}

/// Uniform values in `[-1, 1]` derived from `SHA-256(seed || tag || block)`.
fn expand_weights(seed: u64, tag: &[u8], count: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(count);
    let mut block = 0u64;

    while values.len() < count {
        let mut hasher = Sha256::new();
        hasher.update(seed.to_le_bytes());
        hasher.update(tag);
        hasher.update(block.to_le_bytes());
        let digest = hasher.finalize();

        for chunk in digest.chunks_exact(4) {
            if values.len() == count {
                break;
            }
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            values.push((raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32);
        }
        block += 1;
    }

    values
}
