use crate::checkpoint::CheckpointManager;
use crate::embedding::{EmbeddingProvider, HashEmbedding};
use crate::long_term::LongTermMemory;
use crate::short_term::ShortTermMemory;
use crate::vector::{InMemoryVectorStore, ScoredHit, VectorStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use swarmflow_core::{SwarmResult, Task, WorkflowState};
use tracing::debug;

/// Category under which completed task results are archived.
const TASK_RESULT_CATEGORY: &str = "task_results";

/// Unified entry point over the three memory tiers.
///
/// Orchestration code talks to this facade; the individual tiers stay
/// directly reachable through the accessors for callers that need
/// tier-specific operations.
pub struct MemoryManager {
    short_term: ShortTermMemory,
    long_term: LongTermMemory,
    checkpoints: CheckpointManager,
}

impl MemoryManager {
    /// Create a manager rooted at `storage_path` with the default
    /// in-memory vector store and hash embedder. Checkpoints live in a
    /// `checkpoints/` subdirectory.
    pub async fn new(storage_path: impl Into<PathBuf>) -> SwarmResult<Self> {
        let storage_path = storage_path.into();
        Self::with_backends(
            storage_path,
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashEmbedding::default()),
        )
        .await
    }

    /// Create a manager with explicit vector store and embedding
    /// backends.
    pub async fn with_backends(
        storage_path: impl Into<PathBuf>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> SwarmResult<Self> {
        let storage_path = storage_path.into();
        let checkpoints = CheckpointManager::new(storage_path.join("checkpoints")).await?;
        Ok(Self {
            short_term: ShortTermMemory::new(),
            long_term: LongTermMemory::new(store, embedder, storage_path),
            checkpoints,
        })
    }

    /// Store a value. With `durable = false` the value goes to the
    /// short-term cache and the key is returned; with `durable = true`
    /// it is archived long-term under the "general" category and the
    /// new entry id is returned.
    pub async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        metadata: Option<HashMap<String, serde_json::Value>>,
        durable: bool,
    ) -> SwarmResult<String> {
        if durable {
            let content = serde_json::to_string(&value)?;
            self.long_term
                .store(&content, metadata.unwrap_or_default(), "general")
                .await
        } else {
            self.short_term.set(key, value, None, metadata).await;
            Ok(key.to_string())
        }
    }

    /// Recall long-term entries relevant to `query`.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
    ) -> SwarmResult<Vec<ScoredHit>> {
        self.long_term.recall(query, top_k, category, None).await
    }

    /// Read a value from the short-term cache.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.short_term.get(key).await
    }

    /// Write a value to the short-term cache with an optional TTL.
    pub async fn set(&self, key: &str, value: serde_json::Value, ttl: Option<u64>) {
        self.short_term.set(key, value, ttl, None).await;
    }

    /// Remove a key from the short-term cache.
    pub async fn delete(&self, key: &str) -> bool {
        self.short_term.delete(key).await
    }

    /// Archive a finished task's outcome for later similarity recall.
    pub async fn store_task_result(&self, task: &Task) -> SwarmResult<String> {
        let content = serde_json::to_string(&serde_json::json!({
            "intent": task.intent,
            "result": task.result,
        }))?;

        let mut metadata = HashMap::new();
        metadata.insert("task_id".to_string(), serde_json::json!(task.id));
        metadata.insert("agent".to_string(), serde_json::json!(task.assigned_agent));
        metadata.insert("status".to_string(), serde_json::to_value(task.status)?);

        let id = self
            .long_term
            .store(&content, metadata, TASK_RESULT_CATEGORY)
            .await?;
        debug!(task = %task.id, entry = %id, "Archived task result");
        Ok(id)
    }

    /// Recall archived task results similar to `intent`.
    pub async fn recall_similar_tasks(
        &self,
        intent: &str,
        top_k: usize,
    ) -> SwarmResult<Vec<ScoredHit>> {
        self.long_term
            .recall(intent, top_k, Some(TASK_RESULT_CATEGORY), None)
            .await
    }

    /// Snapshot a workflow's state. Returns the checkpoint id.
    pub async fn save_checkpoint(&self, state: &WorkflowState) -> SwarmResult<String> {
        self.checkpoints
            .save(&state.workflow_id, state, HashMap::new())
            .await
    }

    /// Restore a workflow's state from a checkpoint.
    pub async fn load_checkpoint(&self, checkpoint_id: &str) -> SwarmResult<WorkflowState> {
        self.checkpoints.load(checkpoint_id).await
    }

    /// Flush the durable tier to disk.
    pub async fn persist_all(&self) -> SwarmResult<()> {
        self.long_term.save_to_disk().await
    }

    /// Reload the durable tier from disk.
    pub async fn load_all(&self) -> SwarmResult<()> {
        self.long_term.load_from_disk().await
    }

    /// The short-term tier.
    pub fn short_term(&self) -> &ShortTermMemory {
        &self.short_term
    }

    /// The long-term tier.
    pub fn long_term(&self) -> &LongTermMemory {
        &self.long_term
    }

    /// The checkpoint store.
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }
}
