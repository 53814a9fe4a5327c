use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use swarmflow_core::{SwarmError, SwarmResult, WorkflowState};
use tracing::{debug, info, warn};

/// Schema version written into every checkpoint file.
const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// A point-in-time snapshot of a workflow's full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version of this record.
    #[serde(default)]
    pub schema_version: u32,
    /// Checkpoint identifier, also the file stem on disk.
    pub id: String,
    /// The workflow this snapshot belongs to.
    pub workflow_id: String,
    /// The captured state.
    pub state: WorkflowState,
    /// Caller-supplied annotations (trigger reason, operator, ...).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

/// Listing entry for a stored checkpoint, without the full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Checkpoint identifier.
    pub id: String,
    /// The workflow it belongs to.
    pub workflow_id: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Number of tasks captured in the snapshot.
    pub task_count: usize,
}

/// Saves and restores workflow snapshots as JSON files in a directory.
///
/// One file per checkpoint, named `{id}.ckpt`. Ids embed the workflow id
/// and a millisecond timestamp, so lexical order within a workflow is
/// chronological order.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager over `dir`, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> SwarmResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.ckpt"))
    }

    /// Snapshot `state` to disk. Returns the new checkpoint id.
    pub async fn save(
        &self,
        workflow_id: &str,
        state: &WorkflowState,
        metadata: HashMap<String, serde_json::Value>,
    ) -> SwarmResult<String> {
        let now = Utc::now();
        let id = format!("ckpt_{workflow_id}_{}", now.format("%Y%m%d_%H%M%S_%3f"));

        let checkpoint = Checkpoint {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            id: id.clone(),
            workflow_id: workflow_id.to_string(),
            state: state.clone(),
            metadata,
            created_at: now,
        };

        let json = serde_json::to_string(&checkpoint)?;
        tokio::fs::write(self.path_for(&id), json).await?;

        info!(checkpoint = %id, workflow = %workflow_id, tasks = state.tasks.len(), "Saved checkpoint");
        Ok(id)
    }

    /// Load the workflow state captured in a checkpoint.
    pub async fn load(&self, id: &str) -> SwarmResult<WorkflowState> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(SwarmError::Checkpoint(format!("Checkpoint not found: {id}")));
        }

        let data = tokio::fs::read_to_string(&path).await?;
        let checkpoint: Checkpoint = serde_json::from_str(&data)
            .map_err(|e| SwarmError::Checkpoint(format!("Invalid checkpoint {id}: {e}")))?;

        debug!(checkpoint = %id, workflow = %checkpoint.workflow_id, "Loaded checkpoint");
        Ok(checkpoint.state)
    }

    /// List stored checkpoints, newest first, optionally filtered by
    /// workflow. Unreadable files are skipped with a warning.
    pub async fn list_checkpoints(
        &self,
        workflow_id: Option<&str>,
    ) -> SwarmResult<Vec<CheckpointInfo>> {
        let mut infos = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("ckpt") {
                continue;
            }

            let checkpoint: Checkpoint = match tokio::fs::read_to_string(&path).await {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable checkpoint");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable checkpoint");
                    continue;
                }
            };

            if let Some(wf) = workflow_id {
                if checkpoint.workflow_id != wf {
                    continue;
                }
            }

            infos.push(CheckpointInfo {
                id: checkpoint.id,
                workflow_id: checkpoint.workflow_id,
                created_at: checkpoint.created_at,
                task_count: checkpoint.state.tasks.len(),
            });
        }

        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    /// Delete a checkpoint. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> SwarmResult<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(&path).await?;
        debug!(checkpoint = %id, "Deleted checkpoint");
        Ok(true)
    }

    /// Delete checkpoints older than `max_age_hours`. Returns the count
    /// removed.
    pub async fn cleanup_old(&self, max_age_hours: i64) -> SwarmResult<usize> {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut removed = 0;

        for info in self.list_checkpoints(None).await? {
            if info.created_at < cutoff && self.delete(&info.id).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, max_age_hours, "Cleaned up old checkpoints");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use swarmflow_core::{Task, TaskPriority};

    fn sample_state(workflow_id: &str) -> WorkflowState {
        let mut state = WorkflowState::new(workflow_id);
        let root = Task::new(format!("task_{workflow_id}_root"), "research pricing", TaskPriority::Medium);
        let child = Task::new(
            format!("task_{workflow_id}_root_sub0"),
            "search competitor sites",
            TaskPriority::Medium,
        )
        .with_parent(format!("task_{workflow_id}_root"));
        state.add_task(root);
        state.add_task(child);
        state
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();

        let state = sample_state("wf1");
        let id = manager.save("wf1", &state, HashMap::new()).await.unwrap();
        assert!(id.starts_with("ckpt_wf1_"));

        let restored = manager.load(&id).await.unwrap();
        assert_eq!(restored.workflow_id, state.workflow_id);
        assert_eq!(restored.tasks.len(), state.tasks.len());

        let original_root = state.root_task().unwrap();
        let restored_root = restored.root_task().unwrap();
        assert_eq!(restored_root.id, original_root.id);
        assert_eq!(restored_root.intent, original_root.intent);
        assert_eq!(restored_root.status, original_root.status);
    }

    #[tokio::test]
    async fn test_load_missing_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();
        let err = manager.load("ckpt_none_00000000_000000_000").await.unwrap_err();
        assert!(matches!(err, SwarmError::Checkpoint(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_workflow() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();

        manager.save("wf1", &sample_state("wf1"), HashMap::new()).await.unwrap();
        manager.save("wf2", &sample_state("wf2"), HashMap::new()).await.unwrap();

        let all = manager.list_checkpoints(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let wf1_only = manager.list_checkpoints(Some("wf1")).await.unwrap();
        assert_eq!(wf1_only.len(), 1);
        assert_eq!(wf1_only[0].workflow_id, "wf1");
        assert_eq!(wf1_only[0].task_count, 2);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();

        let first = manager.save("wf1", &sample_state("wf1"), HashMap::new()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = manager.save("wf1", &sample_state("wf1"), HashMap::new()).await.unwrap();

        let listed = manager.list_checkpoints(Some("wf1")).await.unwrap();
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_files() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();

        manager.save("wf1", &sample_state("wf1"), HashMap::new()).await.unwrap();
        tokio::fs::write(tmp.path().join("garbage.ckpt"), "not json")
            .await
            .unwrap();

        let listed = manager.list_checkpoints(None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();

        let id = manager.save("wf1", &sample_state("wf1"), HashMap::new()).await.unwrap();
        assert!(manager.delete(&id).await.unwrap());
        assert!(!manager.delete(&id).await.unwrap());
        assert!(manager.load(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_old_spares_recent() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();
        manager.save("wf1", &sample_state("wf1"), HashMap::new()).await.unwrap();

        // Nothing is older than a day.
        assert_eq!(manager.cleanup_old(24).await.unwrap(), 0);
        assert_eq!(manager.list_checkpoints(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).await.unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("trigger".to_string(), serde_json::json!("dispatch_failure"));
        let id = manager.save("wf1", &sample_state("wf1"), metadata).await.unwrap();

        let data = tokio::fs::read_to_string(tmp.path().join(format!("{id}.ckpt")))
            .await
            .unwrap();
        let checkpoint: Checkpoint = serde_json::from_str(&data).unwrap();
        assert_eq!(
            checkpoint.metadata.get("trigger"),
            Some(&serde_json::json!("dispatch_failure"))
        );
    }
}
