//! Specialist agent contracts and the agent registry.
//!
//! Concrete specialists (how a researcher drives a browser, how a worker
//! fills a form) live outside this workspace; this crate defines the
//! capability contract they satisfy and the registry the orchestrator
//! routes through, plus rule-based reference implementations of the
//! dispatcher and compliance capabilities.
//!
//! # Main types
//!
//! - [`SpecialistAgent`] — Capability-tagged executor contract.
//! - [`DispatcherAgent`] / [`ComplianceAgent`] — Extended capabilities
//!   consumed by the orchestrator's dispatch and pre-check phases.
//! - [`AgentRegistry`] — Explicit name → agent mapping populated at startup.
//! - [`RuleBasedDispatcher`] / [`RuleBasedCompliance`] — Keyword and
//!   pattern based reference implementations (no LLM required).
//! - [`StubAgent`] — Placeholder returning a structured
//!   `not_implemented` result, for wiring and tests.

/// Agent capability contract and descriptor types.
pub mod capability;
/// Dispatch plan and compliance verdict types.
pub mod dispatch;
/// Agent registry with typed dispatcher/compliance slots.
pub mod registry;
/// Rule-based reference agents.
pub mod rules;

pub use capability::{AgentCapability, ComplianceAgent, DispatcherAgent, SpecialistAgent};
pub use dispatch::{ComplianceVerdict, DispatchPlan, SubtaskSpec};
pub use registry::AgentRegistry;
pub use rules::{RuleBasedCompliance, RuleBasedDispatcher, StubAgent};
