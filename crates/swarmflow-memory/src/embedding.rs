use async_trait::async_trait;
use sha2::{Digest, Sha384};
use swarmflow_core::{SwarmError, SwarmResult};

/// Trait for computing text embeddings (fixed-length numeric vectors).
///
/// Real implementations call out to an embedding API; the long-term
/// memory tier only requires that vectors are fixed-length and that
/// identical input yields identical output within one process.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> SwarmResult<Vec<f32>>;

    /// Compute embeddings for a batch of texts.
    async fn embed_batch(&self, texts: &[&str]) -> SwarmResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Deterministic hash-based pseudo-embedding.
///
/// Maps the SHA-384 digest of the text onto values in `[-1, 1]` and
/// cycles them up to the configured dimension. Not a semantic embedding;
/// it exists so the memory tier is testable without an external model.
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    /// Create a provider producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> SwarmResult<Vec<f32>> {
        if text.is_empty() {
            return Err(SwarmError::Memory("Cannot embed empty text".to_string()));
        }

        let digest = Sha384::digest(text.as_bytes());

        // Two digest bytes per component, scaled into [-1, 1].
        let base: Vec<f32> = digest
            .chunks_exact(2)
            .map(|pair| (pair[0] as f32 + pair[1] as f32 * 256.0) / 65535.0 * 2.0 - 1.0)
            .collect();

        let mut vector = Vec::with_capacity(self.dimension);
        while vector.len() < self.dimension {
            let take = (self.dimension - vector.len()).min(base.len());
            vector.extend_from_slice(&base[..take]);
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
