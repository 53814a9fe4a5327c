use crate::capability::{ComplianceAgent, DispatcherAgent, SpecialistAgent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Explicit registry mapping capability names to specialist agents.
///
/// Populated at startup; the orchestrator resolves assigned agents here.
/// Dispatcher and compliance capabilities are held in typed slots so the
/// orchestrator can call `analyze`/`check` without downcasting.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn SpecialistAgent>>,
    dispatcher: Option<Arc<dyn DispatcherAgent>>,
    compliance: Option<Arc<dyn ComplianceAgent>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specialist agent under a capability name.
    pub fn register(&mut self, name: impl Into<String>, agent: Arc<dyn SpecialistAgent>) {
        let name = name.into();
        info!(agent = %name, "Registered agent");
        self.agents.insert(name, agent);
    }

    /// Remove an agent. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        if name == "dispatcher" {
            self.dispatcher = None;
        }
        if name == "compliance" {
            self.compliance = None;
        }
        self.agents.remove(name).is_some()
    }

    /// Install the dispatcher capability. Also registered under the
    /// `"dispatcher"` name so it is visible to lookups.
    pub fn set_dispatcher(&mut self, agent: Arc<dyn DispatcherAgent>) {
        self.agents
            .insert("dispatcher".to_string(), agent.clone() as Arc<dyn SpecialistAgent>);
        self.dispatcher = Some(agent);
        info!("Registered dispatcher capability");
    }

    /// Install the compliance capability. Also registered under the
    /// `"compliance"` name so compliance subtasks can execute it.
    pub fn set_compliance(&mut self, agent: Arc<dyn ComplianceAgent>) {
        self.agents
            .insert("compliance".to_string(), agent.clone() as Arc<dyn SpecialistAgent>);
        self.compliance = Some(agent);
        info!("Registered compliance capability");
    }

    /// Look up an agent by capability name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SpecialistAgent>> {
        self.agents.get(name).cloned()
    }

    /// The installed dispatcher capability, if any.
    pub fn dispatcher(&self) -> Option<Arc<dyn DispatcherAgent>> {
        self.dispatcher.clone()
    }

    /// The installed compliance capability, if any.
    pub fn compliance(&self) -> Option<Arc<dyn ComplianceAgent>> {
        self.compliance.clone()
    }

    /// Names of all registered agents, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether an agent is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }
}
