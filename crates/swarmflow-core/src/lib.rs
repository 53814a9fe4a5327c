//! Core types and error definitions for the Swarmflow framework.
//!
//! This crate provides the foundational types shared across all Swarmflow
//! crates: the unified error enum, the task data model, and the workflow
//! state that the orchestrator checkpoints and resumes.
//!
//! # Main types
//!
//! - [`SwarmError`] — Unified error enum for all Swarmflow subsystems.
//! - [`SwarmResult`] — Convenience alias for `Result<T, SwarmError>`.
//! - [`Task`] — A unit of work routed to a specialist agent.
//! - [`TaskStatus`] / [`TaskPriority`] — Task state machine and ordering.
//! - [`WorkflowState`] — The checkpointable state of one workflow run.
//! - [`WorkflowResult`] — The structured result returned to callers.

/// Task data model: priority, status state machine, and the task itself.
pub mod task;
/// Workflow state, the checkpoint unit, and the caller-facing result.
pub mod workflow;

pub use task::{Task, TaskContext, TaskPriority, TaskStatus};
pub use workflow::{WorkflowResult, WorkflowState, STATE_SCHEMA_VERSION};

// --- Error types ---

/// Top-level error type for the Swarmflow framework.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    /// A configuration error (missing agent, handler, or invalid input),
    /// surfaced before any work is scheduled.
    #[error("Config error: {0}")]
    Config(String),

    /// An error raised inside a specialist agent's `execute`.
    #[error("Agent error: {0}")]
    Agent(String),

    /// A compliance pre-check rejected the task.
    #[error("Compliance blocked: {0}")]
    Compliance(String),

    /// A workflow-level error outside subtask execution (e.g. dispatch).
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// An error in the short-term or long-term memory tiers.
    #[error("Memory error: {0}")]
    Memory(String),

    /// An error while saving or loading a workflow checkpoint.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// An error related to authenticated session pooling or refresh.
    #[error("Session error: {0}")]
    Session(String),

    /// An error in credential encryption, decryption, or storage.
    #[error("Credential error: {0}")]
    Credential(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`SwarmError`].
pub type SwarmResult<T> = Result<T, SwarmError>;
