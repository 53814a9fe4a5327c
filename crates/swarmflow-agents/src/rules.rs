use crate::capability::{AgentCapability, ComplianceAgent, DispatcherAgent, SpecialistAgent};
use crate::dispatch::{ComplianceVerdict, DispatchPlan, SubtaskSpec};
use async_trait::async_trait;
use regex::Regex;
use swarmflow_core::{SwarmResult, TaskContext, TaskPriority};
use tracing::debug;

/// Intents mentioning external sites get a compliance subtask first.
const EXTERNAL_SITE_KEYWORDS: &[&str] = &["website", "site", "scrape", "extract", "portal"];
const RESEARCH_KEYWORDS: &[&str] = &["research", "find", "search", "compare", "analyze market"];
const WORKER_KEYWORDS: &[&str] = &["fill", "submit", "enter", "login", "upload", "download"];

/// Rule-based dispatcher: decomposes an intent into subtasks with plain
/// keyword matching. Stands in for an LLM-backed dispatcher and keeps the
/// dispatch phase deterministic.
#[derive(Debug, Default)]
pub struct RuleBasedDispatcher;

impl RuleBasedDispatcher {
    /// Create a new rule-based dispatcher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpecialistAgent for RuleBasedDispatcher {
    fn capabilities(&self) -> Vec<AgentCapability> {
        vec![
            AgentCapability::new(
                "intent_analysis",
                "Analyze natural language to understand user goals",
                &["analyze", "understand", "plan"],
            ),
            AgentCapability::new(
                "task_decomposition",
                "Break complex tasks into actionable subtasks",
                &["break down", "decompose", "plan"],
            ),
        ]
    }

    async fn execute(
        &self,
        intent: &str,
        context: &TaskContext,
    ) -> SwarmResult<serde_json::Value> {
        // The dispatcher plans; executing it just returns the plan.
        let plan = self.analyze(intent, context).await?;
        Ok(serde_json::json!({
            "status": "completed",
            "plan": serde_json::to_value(&plan)?,
        }))
    }
}

#[async_trait]
impl DispatcherAgent for RuleBasedDispatcher {
    async fn analyze(&self, intent: &str, context: &TaskContext) -> SwarmResult<DispatchPlan> {
        let lowered = intent.to_lowercase();
        let mut subtasks = Vec::new();

        if EXTERNAL_SITE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            let mut overrides = TaskContext::new();
            overrides.insert(
                "original_intent".to_string(),
                serde_json::Value::String(intent.to_string()),
            );
            subtasks.push(
                SubtaskSpec::new(
                    format!("Check compliance for: {intent}"),
                    "compliance",
                    TaskPriority::High,
                )
                .with_context(overrides),
            );
        }

        if RESEARCH_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            subtasks.push(
                SubtaskSpec::new(intent, "researcher", TaskPriority::Medium)
                    .with_context(context.clone()),
            );
        }

        if WORKER_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            subtasks.push(
                SubtaskSpec::new(intent, "worker", TaskPriority::Medium)
                    .with_context(context.clone()),
            );
        }

        // No specific match: route the whole intent to the generic worker.
        if subtasks.is_empty() {
            subtasks.push(
                SubtaskSpec::new(intent, "worker", TaskPriority::Medium)
                    .with_context(context.clone()),
            );
        }

        debug!(subtask_count = subtasks.len(), "Dispatcher: plan built");

        Ok(DispatchPlan {
            original_intent: intent.to_string(),
            subtasks,
        })
    }
}

/// Rule-based compliance agent: screens intents against blocked patterns
/// and flags personal-data handling for review.
pub struct RuleBasedCompliance {
    blocked: Vec<Regex>,
    pii_keywords: Vec<&'static str>,
}

impl RuleBasedCompliance {
    /// Create a compliance agent with the default blocked patterns.
    pub fn new() -> Self {
        let patterns = [
            r"bank.*login",
            r"payment.*credentials",
            r"social\s*security",
            r"passport.*number",
        ];
        Self {
            blocked: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
            pii_keywords: vec!["email", "phone", "address", "personal"],
        }
    }
}

impl Default for RuleBasedCompliance {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpecialistAgent for RuleBasedCompliance {
    fn capabilities(&self) -> Vec<AgentCapability> {
        vec![
            AgentCapability::new(
                "policy_screening",
                "Screen intents against blocked operation patterns",
                &["compliance", "policy", "legal"],
            ),
            AgentCapability::new(
                "gdpr_compliance",
                "Flag personal-data handling for GDPR/CCPA review",
                &["gdpr", "ccpa", "privacy", "data"],
            ),
        ]
    }

    async fn execute(
        &self,
        intent: &str,
        context: &TaskContext,
    ) -> SwarmResult<serde_json::Value> {
        let verdict = self.check(intent, context).await?;
        let recommendation = if verdict.approved {
            "proceed"
        } else {
            "review_required"
        };
        Ok(serde_json::json!({
            "status": "completed",
            "approved": verdict.approved,
            "issues": verdict.issues,
            "requires_human_review": verdict.requires_human_review,
            "recommendation": recommendation,
        }))
    }
}

#[async_trait]
impl ComplianceAgent for RuleBasedCompliance {
    async fn check(&self, intent: &str, _context: &TaskContext) -> SwarmResult<ComplianceVerdict> {
        let lowered = intent.to_lowercase();
        let mut issues = Vec::new();

        for pattern in &self.blocked {
            if pattern.is_match(&lowered) {
                issues.push(format!("Blocked pattern detected: {}", pattern.as_str()));
            }
        }

        if self.pii_keywords.iter().any(|kw| lowered.contains(kw)) {
            issues.push("Task involves personal data - ensure GDPR compliance".to_string());
        }

        if issues.is_empty() {
            Ok(ComplianceVerdict::approved())
        } else {
            Ok(ComplianceVerdict::rejected(issues))
        }
    }
}

/// Placeholder specialist that never performs real work.
///
/// Sub-components without a real implementation (OTP entry, vision form
/// filling) register one of these so orchestration paths stay testable
/// without depending on their behavior.
pub struct StubAgent {
    name: String,
}

impl StubAgent {
    /// Create a stub registered under the given capability name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl SpecialistAgent for StubAgent {
    fn capabilities(&self) -> Vec<AgentCapability> {
        vec![AgentCapability::new(
            self.name.clone(),
            "Unimplemented placeholder capability",
            &[],
        )]
    }

    async fn execute(
        &self,
        intent: &str,
        _context: &TaskContext,
    ) -> SwarmResult<serde_json::Value> {
        Ok(serde_json::json!({
            "status": "not_implemented",
            "agent": self.name,
            "intent": intent,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_research_and_site_intent() {
        let dispatcher = RuleBasedDispatcher::new();
        let plan = dispatcher
            .analyze(
                "Research competitor pricing on their website",
                &TaskContext::new(),
            )
            .await
            .unwrap();

        // Compliance subtask planned first for external-site intents.
        assert_eq!(plan.subtasks[0].agent, "compliance");
        assert_eq!(plan.subtasks[0].priority, TaskPriority::High);
        assert!(plan.subtasks.iter().any(|s| s.agent == "researcher"));
    }

    #[tokio::test]
    async fn test_dispatcher_falls_back_to_worker() {
        let dispatcher = RuleBasedDispatcher::new();
        let plan = dispatcher
            .analyze("Do the quarterly thing", &TaskContext::new())
            .await
            .unwrap();
        assert_eq!(plan.subtasks.len(), 1);
        assert_eq!(plan.subtasks[0].agent, "worker");
    }

    #[tokio::test]
    async fn test_dispatcher_form_intent_routes_worker() {
        let dispatcher = RuleBasedDispatcher::new();
        let plan = dispatcher
            .analyze("Fill the onboarding form and submit it", &TaskContext::new())
            .await
            .unwrap();
        assert!(plan.subtasks.iter().any(|s| s.agent == "worker"));
    }

    #[tokio::test]
    async fn test_compliance_blocks_bank_login() {
        let agent = RuleBasedCompliance::new();
        let verdict = agent
            .check("Automate the bank account login flow", &TaskContext::new())
            .await
            .unwrap();
        assert!(!verdict.approved);
        assert!(verdict.requires_human_review);
        assert!(verdict.reason.is_some());
    }

    #[tokio::test]
    async fn test_compliance_flags_pii() {
        let agent = RuleBasedCompliance::new();
        let verdict = agent
            .check("Collect email addresses from the directory", &TaskContext::new())
            .await
            .unwrap();
        assert!(!verdict.approved);
        assert!(verdict.issues.iter().any(|i| i.contains("GDPR")));
    }

    #[tokio::test]
    async fn test_compliance_approves_clean_intent() {
        let agent = RuleBasedCompliance::new();
        let verdict = agent
            .check("Summarize the public changelog", &TaskContext::new())
            .await
            .unwrap();
        assert!(verdict.approved);
        assert!(verdict.issues.is_empty());
    }

    #[tokio::test]
    async fn test_stub_agent_reports_not_implemented() {
        let agent = StubAgent::new("otp");
        let result = agent.execute("enter the code", &TaskContext::new()).await.unwrap();
        assert_eq!(result["status"], "not_implemented");
        assert_eq!(result["agent"], "otp");
    }
}
