//! Authenticated session pooling and credential storage for the
//! Swarmflow framework.
//!
//! Sessions represent authenticated state on an external service
//! (cookies, storage snapshots, tokens) bound to an automation driver.
//! Credentials never touch disk in the clear: the vault encrypts every
//! secret with AES-256-GCM before persisting it.
//!
//! # Main types
//!
//! - [`CredentialVault`] — Encrypted at-rest credential storage.
//! - [`SessionManager`] — Pools live sessions by id and drives
//!   authentication through registered [`AuthHandler`]s.
//! - [`AuthenticatedSession`] — Captured authenticated state.
//! - [`AutomationHandle`] — Opaque handle to a browser/automation driver.

/// Session manager and authentication handler contract.
pub mod manager;
/// Session state types.
pub mod session;
/// Encrypted credential vault.
pub mod vault;

pub use manager::{AuthHandler, AutomationHandle, SessionManager};
pub use session::{AuthMethod, AuthenticatedSession, SessionArtifacts, SessionStatus};
pub use vault::{CredentialInfo, CredentialVault};
