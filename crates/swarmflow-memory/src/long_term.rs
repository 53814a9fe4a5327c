use crate::embedding::EmbeddingProvider;
use crate::vector::{ScoredHit, VectorRecord, VectorStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use swarmflow_core::{SwarmError, SwarmResult};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Schema version of the on-disk long-term memory document.
const DISK_SCHEMA_VERSION: u32 = 1;

/// Metadata-index record mirroring a vector store entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Entry id, shared with the vector store record.
    pub id: String,
    /// The stored content.
    pub content: String,
    /// Full metadata (content, category, created_at, caller keys).
    pub metadata: HashMap<String, serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct DiskDocument {
    schema_version: u32,
    index: HashMap<String, IndexRecord>,
    vectors: Vec<VectorRecord>,
}

/// Durable memory with vector-similarity recall.
///
/// Content is embedded via the external embedding capability and stored
/// in a pluggable [`VectorStore`]; an in-memory metadata index mirrors
/// every entry for fast lookup by id.
pub struct LongTermMemory {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: RwLock<HashMap<String, IndexRecord>>,
    storage_path: PathBuf,
}

impl LongTermMemory {
    /// Create a long-term memory over the given store and embedder.
    /// `storage_path` is the directory used by disk persistence.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        storage_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            embedder,
            index: RwLock::new(HashMap::new()),
            storage_path: storage_path.into(),
        }
    }

    fn disk_file(&self) -> PathBuf {
        self.storage_path.join("long_term_memory.json")
    }

    /// Store content under a category. Returns the entry id.
    pub async fn store(
        &self,
        content: &str,
        metadata: HashMap<String, serde_json::Value>,
        category: &str,
    ) -> SwarmResult<String> {
        let now = Utc::now();
        let id = derive_id(content, now);
        let embedding = self.embedder.embed(content).await?;

        let mut full_metadata = metadata;
        full_metadata.insert(
            "content".to_string(),
            serde_json::Value::String(content.to_string()),
        );
        full_metadata.insert(
            "category".to_string(),
            serde_json::Value::String(category.to_string()),
        );
        full_metadata.insert(
            "created_at".to_string(),
            serde_json::Value::String(now.to_rfc3339()),
        );

        self.store
            .add(VectorRecord {
                id: id.clone(),
                embedding,
                metadata: full_metadata.clone(),
            })
            .await?;

        let mut index = self.index.write().await;
        index.insert(
            id.clone(),
            IndexRecord {
                id: id.clone(),
                content: content.to_string(),
                metadata: full_metadata,
                created_at: now,
            },
        );

        debug!(entry = %id, category = %category, "Stored long-term memory");
        Ok(id)
    }

    /// Recall entries relevant to `query`, ranked by similarity.
    ///
    /// Fetches `2 * top_k` nearest neighbors, optionally filters by
    /// category and minimum score, and truncates to `top_k`.
    pub async fn recall(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
        min_score: Option<f32>,
    ) -> SwarmResult<Vec<ScoredHit>> {
        let query_embedding = self.embedder.embed(query).await?;
        let mut hits = self.store.search(&query_embedding, top_k * 2).await?;

        if let Some(category) = category {
            hits.retain(|h| {
                h.metadata
                    .get("category")
                    .and_then(|v| v.as_str())
                    .is_some_and(|c| c == category)
            });
        }
        if let Some(min) = min_score {
            hits.retain(|h| h.score >= min);
        }

        hits.truncate(top_k);
        Ok(hits)
    }

    /// Look up an entry's metadata record by id.
    pub async fn get(&self, id: &str) -> Option<IndexRecord> {
        self.index.read().await.get(id).cloned()
    }

    /// Remove an entry. Returns whether the vector store held it.
    pub async fn forget(&self, id: &str) -> SwarmResult<bool> {
        let removed = self.store.delete(id).await?;
        self.index.write().await.remove(id);
        Ok(removed)
    }

    /// Number of indexed entries.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Whether the memory holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    /// Persist the metadata index and the raw vector table as one JSON
    /// document.
    pub async fn save_to_disk(&self) -> SwarmResult<()> {
        tokio::fs::create_dir_all(&self.storage_path).await?;

        let doc = DiskDocument {
            schema_version: DISK_SCHEMA_VERSION,
            index: self.index.read().await.clone(),
            vectors: self.store.dump().await?,
        };

        let path = self.disk_file();
        let json = serde_json::to_string(&doc)?;
        tokio::fs::write(&path, json).await?;
        info!(path = %path.display(), entries = doc.index.len(), "Saved long-term memory");
        Ok(())
    }

    /// Load a previously saved document. A missing file is not an error.
    pub async fn load_from_disk(&self) -> SwarmResult<()> {
        let path = self.disk_file();
        if !path.exists() {
            return Ok(());
        }

        let data = tokio::fs::read_to_string(&path).await?;
        let doc: DiskDocument = serde_json::from_str(&data)
            .map_err(|e| SwarmError::Memory(format!("Invalid memory document: {e}")))?;

        self.store.load(doc.vectors).await?;
        let mut index = self.index.write().await;
        *index = doc.index;

        info!(entries = index.len(), "Loaded long-term memory from disk");
        Ok(())
    }
}

/// Content-derived entry id: 12 hex chars of sha256(content, timestamp).
fn derive_id(content: &str, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(now.to_rfc3339().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..6])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedding;
    use crate::vector::InMemoryVectorStore;

    fn make_memory(dir: &std::path::Path) -> LongTermMemory {
        LongTermMemory::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashEmbedding::default()),
            dir,
        )
    }

    #[tokio::test]
    async fn test_store_and_recall() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = make_memory(tmp.path());

        let id = memory
            .store("competitor pricing findings", HashMap::new(), "research")
            .await
            .unwrap();

        let hits = memory
            .recall("competitor pricing findings", 5, None, None)
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].id, id);
        // Stored content is carried in the hit metadata.
        assert_eq!(
            hits[0].metadata.get("content").and_then(|v| v.as_str()),
            Some("competitor pricing findings")
        );
    }

    #[tokio::test]
    async fn test_recall_category_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = make_memory(tmp.path());

        memory
            .store("entry one", HashMap::new(), "task_results")
            .await
            .unwrap();
        memory
            .store("entry one", HashMap::new(), "general")
            .await
            .unwrap();

        let hits = memory
            .recall("entry one", 10, Some("task_results"), None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].metadata.get("category").and_then(|v| v.as_str()),
            Some("task_results")
        );
    }

    #[tokio::test]
    async fn test_recall_min_score_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = make_memory(tmp.path());
        memory
            .store("something entirely different", HashMap::new(), "general")
            .await
            .unwrap();

        // An exact-match query scores 1.0; a min_score above that filters
        // everything out.
        let hits = memory
            .recall("unrelated query text", 5, None, Some(1.1))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_forget() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = make_memory(tmp.path());

        let id = memory.store("to forget", HashMap::new(), "general").await.unwrap();
        assert!(memory.forget(&id).await.unwrap());
        assert!(memory.get(&id).await.is_none());
        assert!(!memory.forget(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_disk_round_trip() {
        let tmp = tempfile::tempdir().unwrap();

        let id = {
            let memory = make_memory(tmp.path());
            let id = memory
                .store("durable finding", HashMap::new(), "research")
                .await
                .unwrap();
            memory.save_to_disk().await.unwrap();
            id
        };

        let restored = make_memory(tmp.path());
        restored.load_from_disk().await.unwrap();
        assert_eq!(restored.len().await, 1);

        let record = restored.get(&id).await.unwrap();
        assert_eq!(record.content, "durable finding");

        // Recall works against the reloaded vector table.
        let hits = restored.recall("durable finding", 5, None, None).await.unwrap();
        assert_eq!(hits[0].id, id);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = make_memory(tmp.path());
        memory.load_from_disk().await.unwrap();
        assert!(memory.is_empty().await);
    }
}
