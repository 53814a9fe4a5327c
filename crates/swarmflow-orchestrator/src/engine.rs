use crate::config::OrchestratorConfig;
use crate::router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use swarmflow_agents::{
    AgentRegistry, ComplianceAgent, DispatcherAgent, SpecialistAgent, SubtaskSpec,
};
use swarmflow_core::{
    SwarmError, SwarmResult, Task, TaskContext, TaskPriority, TaskStatus, WorkflowResult,
    WorkflowState,
};
use swarmflow_memory::MemoryManager;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Introspection snapshot of the current workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatus {
    /// The workflow being observed.
    pub workflow_id: String,
    /// Total tasks in the run, root included.
    pub total_tasks: usize,
    /// Subtasks completed so far.
    pub completed: usize,
    /// Subtasks failed so far.
    pub failed: usize,
    /// Agent names currently executing (one entry per in-flight
    /// execution).
    pub active_agents: Vec<String>,
}

/// The orchestration engine.
///
/// Decomposes an intent into subtasks through the registered dispatcher
/// capability, executes them with bounded parallelism, isolates per-subtask
/// failures, and aggregates results on the root task. With a memory
/// manager attached it archives task results and checkpoints failed runs
/// for later resumption.
pub struct Orchestrator {
    registry: Arc<RwLock<AgentRegistry>>,
    memory: Option<Arc<MemoryManager>>,
    config: OrchestratorConfig,
    current: RwLock<Option<Arc<RwLock<WorkflowState>>>>,
}

impl Orchestrator {
    /// Create an engine with the given configuration and an empty
    /// registry.
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            registry: Arc::new(RwLock::new(AgentRegistry::new())),
            memory: None,
            config,
            current: RwLock::new(None),
        }
    }

    /// Attach a memory manager. Chainable builder method.
    pub fn with_memory(mut self, memory: Arc<MemoryManager>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Register a specialist agent under a capability name.
    pub async fn register_agent(&self, name: &str, agent: Arc<dyn SpecialistAgent>) {
        self.registry.write().await.register(name, agent);
    }

    /// Remove an agent. Returns whether it was registered.
    pub async fn unregister_agent(&self, name: &str) -> bool {
        self.registry.write().await.unregister(name)
    }

    /// Install the dispatcher capability.
    pub async fn set_dispatcher(&self, agent: Arc<dyn DispatcherAgent>) {
        self.registry.write().await.set_dispatcher(agent);
    }

    /// Install the compliance capability.
    pub async fn set_compliance(&self, agent: Arc<dyn ComplianceAgent>) {
        self.registry.write().await.set_compliance(agent);
    }

    /// Run a workflow for `intent`.
    ///
    /// Subtask failures never surface as `Err`: the root task completes
    /// with an aggregate that lists them, and `tasks_failed` is set on
    /// the returned result. `Err` is reserved for invalid input.
    pub async fn execute(
        &self,
        intent: &str,
        context: TaskContext,
        priority: TaskPriority,
    ) -> SwarmResult<WorkflowResult> {
        let intent = intent.trim();
        if intent.is_empty() {
            return Err(SwarmError::Config("Intent must not be empty".to_string()));
        }

        let workflow_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let root_id = format!("task_{workflow_id}_root");
        info!(workflow = %workflow_id, intent = %intent, "Starting workflow");

        let mut state = WorkflowState::new(&workflow_id);
        let mut root = Task::new(&root_id, intent, priority).with_context(context.clone());

        // Dispatch phase: plan subtasks, or route the whole intent to a
        // single agent when no dispatcher is installed.
        let dispatcher = self.registry.read().await.dispatcher();
        let specs = match dispatcher {
            Some(d) => match d.analyze(intent, &context).await {
                Ok(plan) => plan.subtasks,
                Err(e) => {
                    let message = format!("Dispatch failed: {e}");
                    warn!(workflow = %workflow_id, error = %e, "Dispatch failed");
                    root.fail(message.clone());
                    state.add_task(root);
                    let checkpoint_id = self.checkpoint_failed(&mut state, &root_id).await;
                    return Ok(failed_result(&state, &root_id, message, checkpoint_id));
                }
            },
            None => vec![
                SubtaskSpec::new(intent, router::select_agent(intent), priority)
                    .with_context(context.clone()),
            ],
        };

        let mut subtask_ids = Vec::with_capacity(specs.len());
        for (i, spec) in specs.into_iter().enumerate() {
            let subtask_id = format!("{root_id}_sub{i}");

            // Parent context first, descriptor overrides win.
            let mut merged = context.clone();
            merged.extend(spec.context);

            let subtask = Task::new(&subtask_id, spec.intent, spec.priority)
                .with_agent(spec.agent)
                .with_parent(&root_id)
                .with_context(merged);
            root.subtasks.push(subtask_id.clone());
            subtask_ids.push(subtask_id);
            state.add_task(subtask);
        }

        root.status = TaskStatus::Dispatched;
        state.add_task(root);
        debug!(workflow = %workflow_id, subtasks = subtask_ids.len(), "Plan built");

        let shared = Arc::new(RwLock::new(state));
        *self.current.write().await = Some(shared.clone());

        self.run_batch(shared.clone(), subtask_ids).await;
        Ok(self.finalize(shared, &root_id).await)
    }

    /// Resume a checkpointed workflow: re-run every subtask that had not
    /// reached a terminal state and re-aggregate onto the root.
    pub async fn resume_from_checkpoint(&self, checkpoint_id: &str) -> SwarmResult<WorkflowResult> {
        let memory = self.memory.as_ref().ok_or_else(|| {
            SwarmError::Config("No memory manager attached".to_string())
        })?;

        let state = memory.load_checkpoint(checkpoint_id).await?;
        let root_id = state
            .root_task()
            .map(|t| t.id.clone())
            .ok_or_else(|| {
                SwarmError::Workflow(format!("Checkpoint has no root task: {checkpoint_id}"))
            })?;
        let resumable = state.resumable_task_ids();
        info!(
            workflow = %state.workflow_id,
            checkpoint = %checkpoint_id,
            resumable = resumable.len(),
            "Resuming workflow from checkpoint"
        );

        let shared = Arc::new(RwLock::new(state));
        *self.current.write().await = Some(shared.clone());

        self.run_batch(shared.clone(), resumable).await;
        Ok(self.finalize(shared, &root_id).await)
    }

    /// Snapshot of the most recent run, if any.
    pub async fn get_status(&self) -> Option<WorkflowStatus> {
        let current = self.current.read().await;
        let shared = current.as_ref()?;
        let state = shared.read().await;
        Some(WorkflowStatus {
            workflow_id: state.workflow_id.clone(),
            total_tasks: state.tasks.len(),
            completed: state.completed_count,
            failed: state.failed_count,
            active_agents: state.active_agents.clone(),
        })
    }

    /// Convenience entry point for queue-style callers: a description
    /// plus a task type and optional metadata. A `"priority"` metadata
    /// key of `"low"`, `"high"` or `"critical"` overrides the default.
    pub async fn process_task(
        &self,
        description: &str,
        task_type: &str,
        metadata: Option<TaskContext>,
    ) -> SwarmResult<WorkflowResult> {
        let mut context = metadata.unwrap_or_default();
        let priority = match context.get("priority").and_then(|v| v.as_str()) {
            Some("critical") => TaskPriority::Critical,
            Some("high") => TaskPriority::High,
            Some("low") => TaskPriority::Low,
            _ => TaskPriority::Medium,
        };
        context.insert("task_type".to_string(), json!(task_type));
        self.execute(description, context, priority).await
    }

    /// Execute a batch of subtasks with at most `max_parallel` in flight.
    async fn run_batch(&self, state: Arc<RwLock<WorkflowState>>, task_ids: Vec<String>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let mut handles = Vec::with_capacity(task_ids.len());

        for task_id in task_ids {
            let semaphore = semaphore.clone();
            let state = state.clone();
            let registry = self.registry.clone();
            let memory = self.memory.clone();
            let human_in_loop = self.config.human_in_loop;
            let spawned_id = task_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                run_subtask(registry, memory, state, spawned_id, human_in_loop).await;
            });
            handles.push((task_id, handle));
        }

        for (task_id, handle) in handles {
            if let Err(e) = handle.await {
                // A panicking agent must not leave its subtask in flight:
                // record the abort on the task and release its agent slot.
                warn!(task = %task_id, error = %e, "Subtask aborted");
                let mut guard = state.write().await;
                let st = &mut *guard;
                if let Some(task) = st.tasks.get_mut(&task_id) {
                    if !task.status.is_terminal() {
                        let agent = task.assigned_agent.clone();
                        task.fail(format!("Subtask aborted: {e}"));
                        st.failed_count += 1;
                        if let Some(agent) = agent {
                            remove_one(&mut st.active_agents, &agent);
                        }
                    }
                }
            }
        }
    }

    /// Aggregate subtask outcomes onto the root task and build the
    /// caller-facing result. The root completes regardless of how many
    /// subtasks failed.
    async fn finalize(&self, state: Arc<RwLock<WorkflowState>>, root_id: &str) -> WorkflowResult {
        let mut guard = state.write().await;
        let state = &mut *guard;

        let subtask_ids = state
            .tasks
            .get(root_id)
            .map(|root| root.subtasks.clone())
            .unwrap_or_default();

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut awaiting_human = Vec::new();
        let mut agents_used = Vec::new();

        for id in &subtask_ids {
            let Some(task) = state.tasks.get(id) else { continue };
            if task.status != TaskStatus::Pending {
                if let Some(agent) = &task.assigned_agent {
                    agents_used.push(agent.clone());
                }
            }
            match task.status {
                TaskStatus::Completed => results.push(json!({
                    "task_id": task.id,
                    "agent": task.assigned_agent,
                    "result": task.result,
                })),
                TaskStatus::Failed => failures.push(json!({
                    "task_id": task.id,
                    "agent": task.assigned_agent,
                    "error": task.error,
                })),
                TaskStatus::AwaitingHuman => awaiting_human.push(json!({
                    "task_id": task.id,
                    "agent": task.assigned_agent,
                    "reason": task.context.get("review_reason").cloned(),
                })),
                _ => {}
            }
        }

        agents_used.sort();
        agents_used.dedup();

        let summary = format!(
            "Completed {}/{} subtasks",
            state.completed_count,
            subtask_ids.len()
        );
        let aggregate = json!({
            "summary": summary,
            "results": results,
            "failures": failures,
            "awaiting_human": awaiting_human,
            "subtask_ids": subtask_ids,
        });

        if let Some(root) = state.tasks.get_mut(root_id) {
            root.complete(aggregate.clone());
        }

        let duration_ms = (chrono::Utc::now() - state.started_at)
            .num_milliseconds()
            .max(0) as u64;
        info!(
            workflow = %state.workflow_id,
            completed = state.completed_count,
            failed = state.failed_count,
            duration_ms,
            "Workflow finished"
        );

        WorkflowResult {
            workflow_id: state.workflow_id.clone(),
            task_id: root_id.to_string(),
            status: "completed".to_string(),
            result: Some(aggregate),
            error: None,
            checkpoint_id: None,
            tasks_completed: state.completed_count,
            tasks_failed: state.failed_count,
            duration_ms,
            agents_used,
        }
    }

    /// Checkpoint a failed run when memory is attached. Returns the
    /// checkpoint id, also recorded on the root task.
    async fn checkpoint_failed(
        &self,
        state: &mut WorkflowState,
        root_id: &str,
    ) -> Option<String> {
        let memory = self.memory.as_ref()?;
        match memory.save_checkpoint(state).await {
            Ok(id) => {
                if let Some(root) = state.tasks.get_mut(root_id) {
                    root.checkpoint_id = Some(id.clone());
                }
                Some(id)
            }
            Err(e) => {
                warn!(workflow = %state.workflow_id, error = %e, "Failed to checkpoint");
                None
            }
        }
    }
}

fn failed_result(
    state: &WorkflowState,
    root_id: &str,
    error: String,
    checkpoint_id: Option<String>,
) -> WorkflowResult {
    let duration_ms = (chrono::Utc::now() - state.started_at)
        .num_milliseconds()
        .max(0) as u64;
    WorkflowResult {
        workflow_id: state.workflow_id.clone(),
        task_id: root_id.to_string(),
        status: "failed".to_string(),
        result: None,
        error: Some(error),
        checkpoint_id,
        tasks_completed: state.completed_count,
        tasks_failed: state.failed_count,
        duration_ms,
        agents_used: Vec::new(),
    }
}

/// Execute one subtask end to end: compliance pre-check, agent lookup,
/// execution, and state write-back. Every failure path is contained to
/// this task.
async fn run_subtask(
    registry: Arc<RwLock<AgentRegistry>>,
    memory: Option<Arc<MemoryManager>>,
    state: Arc<RwLock<WorkflowState>>,
    task_id: String,
    human_in_loop: bool,
) {
    let (intent, context, agent_name) = {
        let mut guard = state.write().await;
        let st = &mut *guard;
        let Some(task) = st.tasks.get_mut(&task_id) else {
            return;
        };
        task.status = TaskStatus::InProgress;
        let intent = task.intent.clone();
        let context = task.context.clone();
        let agent_name = task
            .assigned_agent
            .clone()
            .unwrap_or_else(|| router::select_agent(&intent).to_string());
        st.active_agents.push(agent_name.clone());
        (intent, context, agent_name)
    };

    // Compliance pre-check for everything except compliance work itself.
    if agent_name != "compliance" {
        let compliance = registry.read().await.compliance();
        if let Some(compliance) = compliance {
            match compliance.check(&intent, &context).await {
                Ok(verdict) if !verdict.approved => {
                    let reason = verdict
                        .reason
                        .unwrap_or_else(|| "Compliance check failed".to_string());
                    let mut guard = state.write().await;
                    let st = &mut *guard;
                    remove_one(&mut st.active_agents, &agent_name);
                    if human_in_loop {
                        info!(task = %task_id, reason = %reason, "Subtask parked for human review");
                        if let Some(task) = st.tasks.get_mut(&task_id) {
                            // The parking reason lives in the context;
                            // `result` stays reserved for completed tasks.
                            task.status = TaskStatus::AwaitingHuman;
                            task.context
                                .insert("review_reason".to_string(), json!(reason));
                        }
                    } else {
                        if let Some(task) = st.tasks.get_mut(&task_id) {
                            task.fail(format!("Compliance rejected: {reason}"));
                        }
                        st.failed_count += 1;
                    }
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    let mut guard = state.write().await;
                    let st = &mut *guard;
                    remove_one(&mut st.active_agents, &agent_name);
                    if let Some(task) = st.tasks.get_mut(&task_id) {
                        task.fail(format!("Compliance check error: {e}"));
                    }
                    st.failed_count += 1;
                    return;
                }
            }
        }
    }

    let agent = registry.read().await.get(&agent_name);
    let Some(agent) = agent else {
        // Discovered after planning, so it fails the subtask instead of
        // the workflow.
        let mut guard = state.write().await;
        let st = &mut *guard;
        remove_one(&mut st.active_agents, &agent_name);
        if let Some(task) = st.tasks.get_mut(&task_id) {
            task.fail(format!("No agent available: {agent_name}"));
        }
        st.failed_count += 1;
        return;
    };

    debug!(task = %task_id, agent = %agent_name, "Executing subtask");
    match agent.execute(&intent, &context).await {
        Ok(value) => {
            let archived = {
                let mut guard = state.write().await;
                let st = &mut *guard;
                remove_one(&mut st.active_agents, &agent_name);
                match st.tasks.get_mut(&task_id) {
                    Some(task) => {
                        task.complete(value);
                        st.completed_count += 1;
                        Some(task.clone())
                    }
                    None => None,
                }
            };
            if let (Some(memory), Some(task)) = (memory.as_ref(), archived) {
                if let Err(e) = memory.store_task_result(&task).await {
                    warn!(task = %task_id, error = %e, "Failed to archive task result");
                }
            }
        }
        Err(e) => {
            warn!(task = %task_id, agent = %agent_name, error = %e, "Subtask failed");
            let mut guard = state.write().await;
            let st = &mut *guard;
            remove_one(&mut st.active_agents, &agent_name);
            if let Some(task) = st.tasks.get_mut(&task_id) {
                task.fail(e.to_string());
            }
            st.failed_count += 1;
        }
    }
}

/// Remove one occurrence of `name` from the active-agent multiset.
fn remove_one(agents: &mut Vec<String>, name: &str) {
    if let Some(pos) = agents.iter().position(|a| a == name) {
        agents.remove(pos);
    }
}
