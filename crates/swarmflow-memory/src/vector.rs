use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swarmflow_core::{SwarmError, SwarmResult};
use tokio::sync::RwLock;

/// One vector plus its metadata, as held by a [`VectorStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Entry identifier.
    pub id: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Metadata stored alongside the vector (content, category, ...).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A search hit with its cosine similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    /// Entry identifier.
    pub id: String,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
    /// The entry's metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Trait for vector storage backends.
///
/// The in-memory implementation below is the reference; a real ANN index
/// can be substituted without touching the long-term memory contract.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a record.
    async fn add(&self, record: VectorRecord) -> SwarmResult<()>;

    /// The `top_k` records most similar to the query, best first.
    async fn search(&self, query: &[f32], top_k: usize) -> SwarmResult<Vec<ScoredHit>>;

    /// Delete a record by id. Returns whether it was present.
    async fn delete(&self, id: &str) -> SwarmResult<bool>;

    /// Number of stored records.
    async fn count(&self) -> SwarmResult<usize>;

    /// All records, for persistence.
    async fn dump(&self) -> SwarmResult<Vec<VectorRecord>>;

    /// Replace the store's contents with the given records.
    async fn load(&self, records: Vec<VectorRecord>) -> SwarmResult<()>;
}

/// Brute-force in-memory vector store using cosine similarity.
///
/// Acceptable for small corpora; explicitly not a production ANN index.
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, record: VectorRecord) -> SwarmResult<()> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> SwarmResult<Vec<ScoredHit>> {
        if query.is_empty() {
            return Err(SwarmError::Memory("Empty query embedding".to_string()));
        }

        let records = self.records.read().await;
        let mut scored: Vec<ScoredHit> = records
            .values()
            .map(|r| ScoredHit {
                id: r.id.clone(),
                score: cosine_similarity(query, &r.embedding),
                metadata: r.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, id: &str) -> SwarmResult<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn count(&self) -> SwarmResult<usize> {
        Ok(self.records.read().await.len())
    }

    async fn dump(&self) -> SwarmResult<Vec<VectorRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn load(&self, new_records: Vec<VectorRecord>) -> SwarmResult<()> {
        let mut records = self.records.write().await;
        records.clear();
        for record in new_records {
            records.insert(record.id.clone(), record);
        }
        Ok(())
    }
}

/// Cosine similarity between two vectors.
/// Defined as 0.0 when the lengths differ or either norm is 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_add_and_count() {
        let store = InMemoryVectorStore::new();
        assert_eq!(store.count().await.unwrap(), 0);
        store.add(record("a", vec![1.0, 0.0])).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.add(record("near", vec![0.9, 0.1, 0.0])).await.unwrap();
        store.add(record("far", vec![0.0, 0.0, 1.0])).await.unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_search_truncates_to_top_k() {
        let store = InMemoryVectorStore::new();
        for i in 0..8 {
            let mut emb = vec![0.0f32; 3];
            emb[i % 3] = 1.0;
            store.add(record(&format!("e{i}"), emb)).await.unwrap();
        }
        let hits = store.search(&[1.0, 0.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_search_empty_query_errors() {
        let store = InMemoryVectorStore::new();
        assert!(store.search(&[], 5).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryVectorStore::new();
        store.add(record("a", vec![1.0])).await.unwrap();
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dump_and_load_round_trip() {
        let store = InMemoryVectorStore::new();
        store.add(record("a", vec![1.0, 0.0])).await.unwrap();
        store.add(record("b", vec![0.0, 1.0])).await.unwrap();

        let dumped = store.dump().await.unwrap();
        let restored = InMemoryVectorStore::new();
        restored.load(dumped).await.unwrap();
        assert_eq!(restored.count().await.unwrap(), 2);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.5, 0.5, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
