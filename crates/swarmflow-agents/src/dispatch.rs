use serde::{Deserialize, Serialize};
use swarmflow_core::{TaskContext, TaskPriority};

/// One planned subtask inside a [`DispatchPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskSpec {
    /// Natural-language intent for the subtask.
    pub intent: String,
    /// Capability name of the agent that should execute it.
    pub agent: String,
    /// Priority of the subtask.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Context overrides merged over the parent task's context
    /// (these keys win on conflict).
    #[serde(default)]
    pub context: TaskContext,
}

impl SubtaskSpec {
    /// Create a subtask spec with empty context overrides.
    pub fn new(intent: impl Into<String>, agent: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            intent: intent.into(),
            agent: agent.into(),
            priority,
            context: TaskContext::new(),
        }
    }

    /// Attach context overrides. Chainable builder method.
    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }
}

/// The ordered subtask plan produced by a dispatcher's `analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPlan {
    /// The intent the plan was derived from.
    pub original_intent: String,
    /// Ordered subtask descriptors. Order is planning order only; the
    /// orchestrator gives no relative completion guarantee.
    pub subtasks: Vec<SubtaskSpec>,
}

/// Outcome of a compliance pre-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    /// Whether the task may proceed without human review.
    pub approved: bool,
    /// Issues found during the check.
    #[serde(default)]
    pub issues: Vec<String>,
    /// The leading issue, if any, for log and error messages.
    pub reason: Option<String>,
    /// Whether a human should review before execution.
    #[serde(default)]
    pub requires_human_review: bool,
}

impl ComplianceVerdict {
    /// A verdict with no issues.
    pub fn approved() -> Self {
        Self {
            approved: true,
            issues: Vec::new(),
            reason: None,
            requires_human_review: false,
        }
    }

    /// A rejection carrying the given issues; the first issue becomes
    /// the `reason`.
    pub fn rejected(issues: Vec<String>) -> Self {
        let reason = issues.first().cloned();
        Self {
            approved: false,
            issues,
            reason,
            requires_human_review: true,
        }
    }
}
