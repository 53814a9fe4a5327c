use crate::session::{AuthenticatedSession, SessionArtifacts, SessionStatus};
use crate::vault::CredentialVault;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use swarmflow_core::{SwarmError, SwarmResult};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Opaque handle to an automation driver (browser, RPA runtime, ...).
///
/// The session layer never drives the automation itself; handlers
/// receive the handle and do service-specific work against it.
pub trait AutomationHandle: Send + Sync {
    /// Driver-side identifier for this automation session.
    fn id(&self) -> &str;
}

/// Service-specific authentication logic.
///
/// One handler per service, registered with the [`SessionManager`].
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Perform a full login and return the captured session state.
    async fn authenticate(
        &self,
        handle: &dyn AutomationHandle,
        credentials: &HashMap<String, String>,
    ) -> SwarmResult<SessionArtifacts>;

    /// Check whether a previously captured session is still accepted by
    /// the service.
    async fn verify_session(
        &self,
        handle: &dyn AutomationHandle,
        session: &AuthenticatedSession,
    ) -> SwarmResult<bool>;

    /// Attempt to refresh a stale session without a full re-login.
    /// Returns `None` when refresh is not possible for this service.
    async fn refresh_session(
        &self,
        handle: &dyn AutomationHandle,
        session: &AuthenticatedSession,
    ) -> SwarmResult<Option<SessionArtifacts>>;
}

/// Pools authenticated sessions and drives login through registered
/// handlers.
///
/// The pool is keyed by session id, so a service can hold several
/// concurrent sessions. An active pooled session for the requested
/// service is reused instead of re-authenticating; `force_new` bypasses
/// the pool. Session state is persisted without auth tokens so a restart
/// can attempt [`SessionManager::restore_session`] by session id instead
/// of a fresh login.
pub struct SessionManager {
    vault: CredentialVault,
    pool: RwLock<HashMap<String, AuthenticatedSession>>,
    handlers: RwLock<HashMap<String, Arc<dyn AuthHandler>>>,
    sessions_dir: PathBuf,
}

impl SessionManager {
    /// Create a manager rooted at `dir`. The credential vault lives in
    /// `vault/` and persisted sessions in `sessions/` underneath it.
    pub async fn new(dir: impl Into<PathBuf>) -> SwarmResult<Self> {
        let dir = dir.into();
        let vault = CredentialVault::new(dir.join("vault")).await?;
        let sessions_dir = dir.join("sessions");
        tokio::fs::create_dir_all(&sessions_dir).await?;

        Ok(Self {
            vault,
            pool: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            sessions_dir,
        })
    }

    /// The manager's credential vault.
    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Register the authentication handler for a service.
    pub async fn register_handler(&self, service: &str, handler: Arc<dyn AuthHandler>) {
        info!(service = %service, "Registered auth handler");
        self.handlers.write().await.insert(service.to_string(), handler);
    }

    /// Get an authenticated session for `service`.
    ///
    /// Reuses an active pooled session unless `force_new` is set;
    /// otherwise authenticates via the registered handler, using
    /// credentials from the vault when `credential_id` is given.
    pub async fn get_session(
        &self,
        service: &str,
        handle: &dyn AutomationHandle,
        credential_id: Option<&str>,
        force_new: bool,
    ) -> SwarmResult<AuthenticatedSession> {
        if !force_new {
            let mut pool = self.pool.write().await;
            for session in pool.values_mut() {
                if session.service == service && session.is_active() {
                    session.touch();
                    session.automation_session_id = Some(handle.id().to_string());
                    debug!(service = %service, session = %session.id, "Reusing pooled session");
                    return Ok(session.clone());
                }
            }
        }

        let handler = self
            .handlers
            .read()
            .await
            .get(service)
            .cloned()
            .ok_or_else(|| {
                SwarmError::Config(format!("No auth handler registered for service: {service}"))
            })?;

        let credentials = match credential_id {
            None => HashMap::new(),
            Some(id) => self.vault.retrieve(id).await?.ok_or_else(|| {
                SwarmError::Credential(format!("Credential not found or expired: {id}"))
            })?,
        };

        let mut session = AuthenticatedSession::new(service);
        session.status = SessionStatus::Authenticating;
        session.automation_session_id = Some(handle.id().to_string());

        match handler.authenticate(handle, &credentials).await {
            Ok(artifacts) => {
                session.activate(artifacts);
                info!(service = %service, session = %session.id, "Authenticated new session");
            }
            Err(e) => {
                session.status = SessionStatus::Failed;
                warn!(service = %service, error = %e, "Authentication failed");
                self.pool
                    .write()
                    .await
                    .insert(session.id.clone(), session);
                return Err(e);
            }
        }

        self.persist(&session).await?;
        self.pool
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Try to bring a pooled or persisted session back by id.
    ///
    /// Verifies the session against its service; a stale session is
    /// refreshed through the handler when possible. Returns `None` when
    /// nothing usable could be restored.
    pub async fn restore_session(
        &self,
        session_id: &str,
        handle: &dyn AutomationHandle,
    ) -> SwarmResult<Option<AuthenticatedSession>> {
        {
            let mut pool = self.pool.write().await;
            if let Some(session) = pool.get_mut(session_id) {
                if session.is_active() {
                    session.touch();
                    session.automation_session_id = Some(handle.id().to_string());
                    return Ok(Some(session.clone()));
                }
            }
        }

        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }

        let data = tokio::fs::read_to_string(&path).await?;
        let mut session: AuthenticatedSession = serde_json::from_str(&data)
            .map_err(|e| SwarmError::Session(format!("Corrupt session {session_id}: {e}")))?;

        let handler = match self.handlers.read().await.get(&session.service).cloned() {
            None => return Ok(None),
            Some(h) => h,
        };

        session.automation_session_id = Some(handle.id().to_string());

        if session.is_active() && handler.verify_session(handle, &session).await? {
            session.touch();
            info!(service = %session.service, session = %session.id, "Restored session");
        } else {
            match handler.refresh_session(handle, &session).await? {
                Some(artifacts) => {
                    session.activate(artifacts);
                    info!(service = %session.service, session = %session.id, "Refreshed stale session");
                }
                None => {
                    debug!(session = %session_id, "Persisted session unrecoverable");
                    return Ok(None);
                }
            }
        }

        self.persist(&session).await?;
        self.pool
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(Some(session))
    }

    /// Drop a session from the pool and from disk by id.
    /// Returns whether a pooled session existed.
    pub async fn invalidate_session(&self, session_id: &str) -> SwarmResult<bool> {
        let existed = self.pool.write().await.remove(session_id).is_some();

        let path = self.session_path(session_id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }

        if existed {
            info!(session = %session_id, "Invalidated session");
        }
        Ok(existed)
    }

    /// Snapshot of currently active pooled sessions.
    pub async fn active_sessions(&self) -> Vec<AuthenticatedSession> {
        let mut pool = self.pool.write().await;
        let mut active = Vec::new();
        for session in pool.values_mut() {
            if session.is_active() {
                active.push(session.clone());
            }
        }
        active
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{session_id}.json"))
    }

    /// Persist session state with auth tokens stripped.
    async fn persist(&self, session: &AuthenticatedSession) -> SwarmResult<()> {
        let mut scrubbed = session.clone();
        scrubbed.auth_tokens.clear();
        let json = serde_json::to_string(&scrubbed)?;
        tokio::fs::write(self.session_path(&session.id), json).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::AuthMethod;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHandle;

    impl AutomationHandle for StubHandle {
        fn id(&self) -> &str {
            "driver-1"
        }
    }

    struct CountingHandler {
        auth_calls: AtomicUsize,
        verify_result: bool,
        fail: bool,
    }

    impl CountingHandler {
        fn new() -> Self {
            Self {
                auth_calls: AtomicUsize::new(0),
                verify_result: true,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                auth_calls: AtomicUsize::new(0),
                verify_result: false,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl AuthHandler for CountingHandler {
        async fn authenticate(
            &self,
            _handle: &dyn AutomationHandle,
            credentials: &HashMap<String, String>,
        ) -> SwarmResult<SessionArtifacts> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SwarmError::Session("login rejected".to_string()));
            }
            let mut tokens = HashMap::new();
            if let Some(user) = credentials.get("username") {
                tokens.insert("user".to_string(), user.clone());
            }
            tokens.insert("access".to_string(), "tok-abc".to_string());
            Ok(SessionArtifacts {
                auth_tokens: tokens,
                ..Default::default()
            })
        }

        async fn verify_session(
            &self,
            _handle: &dyn AutomationHandle,
            _session: &AuthenticatedSession,
        ) -> SwarmResult<bool> {
            Ok(self.verify_result)
        }

        async fn refresh_session(
            &self,
            _handle: &dyn AutomationHandle,
            _session: &AuthenticatedSession,
        ) -> SwarmResult<Option<SessionArtifacts>> {
            Ok(None)
        }
    }

    async fn make_manager(dir: &std::path::Path) -> SessionManager {
        SessionManager::new(dir).await.unwrap()
    }

    #[tokio::test]
    async fn test_pool_reuses_active_session() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        let handler = Arc::new(CountingHandler::new());
        manager.register_handler("crm.example.com", handler.clone()).await;

        let first = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();
        let second = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(handler.auth_calls.load(Ordering::SeqCst), 1);
        assert!(second.last_activity > first.last_activity);
    }

    #[tokio::test]
    async fn test_force_new_bypasses_pool() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        let handler = Arc::new(CountingHandler::new());
        manager.register_handler("crm.example.com", handler.clone()).await;

        manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();
        manager
            .get_session("crm.example.com", &StubHandle, None, true)
            .await
            .unwrap();

        assert_eq!(handler.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_handler_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        let err = manager
            .get_session("unknown.example.com", &StubHandle, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::Config(_)));
    }

    #[tokio::test]
    async fn test_credentials_flow_from_vault() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        let handler = Arc::new(CountingHandler::new());
        manager.register_handler("crm.example.com", handler).await;

        let mut creds = HashMap::new();
        creds.insert("username".to_string(), "ops@example.com".to_string());
        let cred_id = manager
            .vault()
            .store("crm.example.com", AuthMethod::Password, &creds, None, None)
            .await
            .unwrap();

        let session = manager
            .get_session("crm.example.com", &StubHandle, Some(&cred_id), false)
            .await
            .unwrap();
        assert_eq!(session.auth_tokens.get("user").unwrap(), "ops@example.com");
    }

    #[tokio::test]
    async fn test_unknown_credential_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        manager
            .register_handler("crm.example.com", Arc::new(CountingHandler::new()))
            .await;

        let err = manager
            .get_session("crm.example.com", &StubHandle, Some("cred_missing"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::Credential(_)));
    }

    #[tokio::test]
    async fn test_failed_auth_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        manager
            .register_handler("crm.example.com", Arc::new(CountingHandler::failing()))
            .await;

        let err = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::Session(_)));
        assert!(manager.active_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_forces_reauth() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        let handler = Arc::new(CountingHandler::new());
        manager.register_handler("crm.example.com", handler.clone()).await;

        let session = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();
        assert!(manager.invalidate_session(&session.id).await.unwrap());

        manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();
        assert_eq!(handler.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_restore_verified_session() {
        let tmp = tempfile::tempdir().unwrap();

        let session_id = {
            let manager = make_manager(tmp.path()).await;
            manager
                .register_handler("crm.example.com", Arc::new(CountingHandler::new()))
                .await;
            manager
                .get_session("crm.example.com", &StubHandle, None, false)
                .await
                .unwrap()
                .id
        };

        // New manager over the same directory simulates a restart.
        let manager = make_manager(tmp.path()).await;
        manager
            .register_handler("crm.example.com", Arc::new(CountingHandler::new()))
            .await;

        let restored = manager
            .restore_session(&session_id, &StubHandle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.id, session_id);
        assert_eq!(restored.status, SessionStatus::Active);
        assert_eq!(manager.active_sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_nothing_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        manager
            .register_handler("crm.example.com", Arc::new(CountingHandler::new()))
            .await;

        let restored = manager
            .restore_session("sess_unknown", &StubHandle)
            .await
            .unwrap();
        assert!(restored.is_none());
    }

    #[tokio::test]
    async fn test_service_can_hold_multiple_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        let handler = Arc::new(CountingHandler::new());
        manager.register_handler("crm.example.com", handler.clone()).await;

        let first = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();
        let second = manager
            .get_session("crm.example.com", &StubHandle, None, true)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(manager.active_sessions().await.len(), 2);

        // Invalidating one session leaves the other usable.
        assert!(manager.invalidate_session(&first.id).await.unwrap());
        let reused = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();
        assert_eq!(reused.id, second.id);
        assert_eq!(handler.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persisted_session_has_no_tokens() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = make_manager(tmp.path()).await;
        manager
            .register_handler("crm.example.com", Arc::new(CountingHandler::new()))
            .await;

        let session = manager
            .get_session("crm.example.com", &StubHandle, None, false)
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(
            tmp.path().join("sessions").join(format!("{}.json", session.id)),
        )
        .await
        .unwrap();
        assert!(!raw.contains("tok-abc"));
    }
}
