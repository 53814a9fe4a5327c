use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arbitrary string-keyed context attached to a task.
///
/// Subtask context is the parent context merged with dispatch-provided
/// overrides; descriptor keys win on conflict.
pub type TaskContext = HashMap<String, serde_json::Value>;

/// Ordering of tasks when scheduling. Low < Medium < High < Critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Background work, lowest urgency.
    Low,
    /// The default priority.
    #[default]
    Medium,
    /// Elevated priority (e.g. compliance pre-checks).
    High,
    /// Highest priority.
    Critical,
}

impl TaskPriority {
    /// Map a numeric level (1..=4) to a priority, as used by dispatch
    /// plans. Out-of-range values fall back to [`TaskPriority::Medium`].
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => TaskPriority::Low,
            3 => TaskPriority::High,
            4 => TaskPriority::Critical,
            _ => TaskPriority::Medium,
        }
    }
}

/// Status of a task in its lifecycle.
///
/// Transitions are monotonic:
/// `Pending → Dispatched → InProgress → {Completed | Failed | AwaitingHuman}`;
/// `AwaitingHuman` resumes to `InProgress` on approval or moves to `Failed`
/// without human-in-the-loop support. `Cancelled` is reachable from any
/// non-terminal state. Terminal states: `Completed`, `Failed`, `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet planned.
    Pending,
    /// Dispatch has planned subtasks for this task.
    Dispatched,
    /// An agent is currently executing this task.
    InProgress,
    /// Blocked on human approval after a compliance rejection.
    AwaitingHuman,
    /// Finished successfully; `result` is set.
    Completed,
    /// Finished with an error; `error` is set.
    Failed,
    /// Stopped before reaching a terminal state.
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// A unit of work for the agent swarm.
///
/// Tasks form a tree via `parent_task_id`; the root task of a workflow has
/// none. The `subtasks` list is append-only and fixed once dispatch for
/// this task completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the workflow.
    pub id: String,
    /// Natural-language description of what to accomplish.
    pub intent: String,
    /// Scheduling priority.
    pub priority: TaskPriority,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Capability name of the agent assigned to execute this task.
    pub assigned_agent: Option<String>,
    /// Parent task, if this is a subtask.
    pub parent_task_id: Option<String>,
    /// Ordered child task ids created by dispatch.
    #[serde(default)]
    pub subtasks: Vec<String>,
    /// Merged execution context.
    #[serde(default)]
    pub context: TaskContext,
    /// Result payload, set only when `status == Completed`.
    pub result: Option<serde_json::Value>,
    /// Error string, set only when `status == Failed`.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp, set on reaching a terminal success.
    pub completed_at: Option<DateTime<Utc>>,
    /// Checkpoint id, set when the owning workflow was checkpointed
    /// after a failure.
    pub checkpoint_id: Option<String>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(id: impl Into<String>, intent: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            id: id.into(),
            intent: intent.into(),
            priority,
            status: TaskStatus::Pending,
            assigned_agent: None,
            parent_task_id: None,
            subtasks: Vec::new(),
            context: TaskContext::new(),
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            checkpoint_id: None,
        }
    }

    /// Attach a context map. Chainable builder method.
    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }

    /// Assign an agent capability name. Chainable builder method.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent.into());
        self
    }

    /// Set the parent task id. Chainable builder method.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent.into());
        self
    }

    /// Mark this task completed with the given result payload.
    pub fn complete(&mut self, result: serde_json::Value) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Mark this task failed with the given error string.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation_defaults() {
        let task = Task::new("t1", "research pricing", TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_agent.is_none());
        assert!(task.subtasks.is_empty());
        assert!(task.result.is_none());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::Low < TaskPriority::Medium);
        assert!(TaskPriority::Medium < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Critical);
    }

    #[test]
    fn test_priority_from_level() {
        assert_eq!(TaskPriority::from_level(1), TaskPriority::Low);
        assert_eq!(TaskPriority::from_level(2), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_level(3), TaskPriority::High);
        assert_eq!(TaskPriority::from_level(4), TaskPriority::Critical);
        assert_eq!(TaskPriority::from_level(9), TaskPriority::Medium);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::AwaitingHuman.is_terminal());
    }

    #[test]
    fn test_complete_sets_result_and_timestamp() {
        let mut task = Task::new("t1", "fill form", TaskPriority::High);
        task.complete(serde_json::json!({"status": "completed"}));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert!(task.result.is_some());
    }

    #[test]
    fn test_fail_sets_error() {
        let mut task = Task::new("t1", "fill form", TaskPriority::Low);
        task.fail("agent crashed");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("agent crashed"));
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::AwaitingHuman).unwrap();
        assert_eq!(json, "\"awaiting_human\"");
        let parsed: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TaskStatus::AwaitingHuman);
    }
}
