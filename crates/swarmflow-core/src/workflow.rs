use crate::task::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema version written into serialized workflow state, so checkpoints
/// remain loadable across implementation versions.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// The full state of one orchestrated workflow run.
///
/// This is the unit of checkpointing: it owns every [`Task`] of the run
/// and holds no live handles, so it can be serialized, persisted, and
/// later deserialized into an independent in-memory object graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Schema version of this state record.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Unique workflow identifier.
    pub workflow_id: String,
    /// All tasks of the run, keyed by task id. Sole owner of the tasks.
    #[serde(default)]
    pub tasks: HashMap<String, Task>,
    /// Agent names currently executing, for introspection. A multiset:
    /// the same name appears once per in-flight execution.
    #[serde(default)]
    pub active_agents: Vec<String>,
    /// Number of subtasks that reached `Completed`.
    pub completed_count: usize,
    /// Number of subtasks that reached `Failed`.
    pub failed_count: usize,
    /// When the workflow started.
    pub started_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    STATE_SCHEMA_VERSION
}

impl WorkflowState {
    /// Create a fresh state for the given workflow id.
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            workflow_id: workflow_id.into(),
            tasks: HashMap::new(),
            active_agents: Vec::new(),
            completed_count: 0,
            failed_count: 0,
            started_at: Utc::now(),
        }
    }

    /// Insert a task into the run.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// The root task of the run (the one without a parent), if any.
    pub fn root_task(&self) -> Option<&Task> {
        self.tasks.values().find(|t| t.parent_task_id.is_none())
    }

    /// Ids of all tasks still in a non-terminal, resumable status
    /// (Pending, Dispatched, InProgress), sorted by creation time.
    pub fn resumable_task_ids(&self) -> Vec<String> {
        let mut pending: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| {
                matches!(
                    t.status,
                    TaskStatus::Pending | TaskStatus::Dispatched | TaskStatus::InProgress
                ) && t.parent_task_id.is_some()
            })
            .collect();
        pending.sort_by_key(|t| t.created_at);
        pending.into_iter().map(|t| t.id.clone()).collect()
    }
}

/// Structured result returned by the orchestrator's `execute`.
///
/// Subtask-level failures never surface as an `Err`; callers inspect
/// `tasks_failed` and the per-subtask failure list inside `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// The workflow this result belongs to.
    pub workflow_id: String,
    /// The root task id.
    pub task_id: String,
    /// `"completed"` or `"failed"` (root-level outcome only).
    pub status: String,
    /// Aggregated result payload (summary, results, failures, subtask ids).
    pub result: Option<serde_json::Value>,
    /// Root-level error, set only when `status == "failed"`.
    pub error: Option<String>,
    /// Checkpoint to pass to `resume_from_checkpoint`, set on root failure
    /// when a memory manager is attached.
    pub checkpoint_id: Option<String>,
    /// Count of subtasks that completed.
    pub tasks_completed: usize,
    /// Count of subtasks that failed.
    pub tasks_failed: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Distinct agent names that executed at least one subtask.
    pub agents_used: Vec<String>,
}
