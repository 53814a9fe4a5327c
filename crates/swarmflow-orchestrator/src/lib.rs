//! Workflow orchestration engine for the Swarmflow framework.
//!
//! Takes a natural-language intent, decomposes it into subtasks through
//! the dispatcher capability, fans the subtasks out to specialist agents
//! with bounded parallelism, and aggregates the outcomes on a root task.
//! A failing subtask never takes down its siblings or the workflow.
//!
//! # Main types
//!
//! - [`Orchestrator`] — The engine: `execute`, `resume_from_checkpoint`,
//!   `process_task`.
//! - [`OrchestratorConfig`] — Concurrency limit and human-in-the-loop
//!   switch.
//! - [`WorkflowStatus`] — Introspection snapshot of the current run.
//! - [`router::select_agent`] — Keyword fallback routing when no
//!   dispatcher is installed.

/// Engine configuration.
pub mod config;
/// The orchestration engine itself.
pub mod engine;
/// Keyword-based fallback agent routing.
pub mod router;

pub use config::OrchestratorConfig;
pub use engine::{Orchestrator, WorkflowStatus};
pub use router::select_agent;
