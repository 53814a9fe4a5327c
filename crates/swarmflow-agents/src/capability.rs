use crate::dispatch::{ComplianceVerdict, DispatchPlan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swarmflow_core::{SwarmResult, TaskContext};

/// Describes one thing an agent can do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    /// Short capability name, e.g. `"web_research"`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Keywords that hint this capability applies to an intent.
    pub keywords: Vec<String>,
    /// Whether this capability needs a browser-like automation handle.
    #[serde(default)]
    pub requires_browser: bool,
    /// Whether this capability needs an authenticated session.
    #[serde(default)]
    pub requires_auth: bool,
}

impl AgentCapability {
    /// Create a capability descriptor with no browser or auth requirement.
    pub fn new(name: impl Into<String>, description: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            requires_browser: false,
            requires_auth: false,
        }
    }

    /// Mark this capability as requiring a browser handle.
    pub fn with_browser(mut self) -> Self {
        self.requires_browser = true;
        self
    }

    /// Mark this capability as requiring an authenticated session.
    pub fn with_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// The contract every specialist agent satisfies.
///
/// `execute` returns a JSON object that always carries a `"status"`
/// discriminator and either a payload or an `"error"` string. Errors an
/// agent cannot express as a structured result are returned as `Err` and
/// isolated to the executing subtask by the orchestrator.
#[async_trait]
pub trait SpecialistAgent: Send + Sync {
    /// The capabilities this agent provides.
    fn capabilities(&self) -> Vec<AgentCapability>;

    /// Execute a task described by `intent` with the merged `context`.
    async fn execute(&self, intent: &str, context: &TaskContext)
        -> SwarmResult<serde_json::Value>;
}

/// Extended capability: decompose an intent into a subtask plan.
///
/// Consumed only by the orchestrator's dispatch phase; `analyze` plans,
/// it never executes.
#[async_trait]
pub trait DispatcherAgent: SpecialistAgent {
    /// Analyze an intent and produce an ordered subtask plan.
    async fn analyze(&self, intent: &str, context: &TaskContext) -> SwarmResult<DispatchPlan>;
}

/// Extended capability: pre-execution compliance gate.
///
/// Consulted synchronously before every non-compliance subtask executes.
#[async_trait]
pub trait ComplianceAgent: SpecialistAgent {
    /// Quick compliance check for an intent.
    async fn check(&self, intent: &str, context: &TaskContext) -> SwarmResult<ComplianceVerdict>;
}
