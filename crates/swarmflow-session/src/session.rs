use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// How a service is authenticated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Username and password form login.
    Password,
    /// OAuth 2.0 flow.
    Oauth,
    /// Static API key.
    ApiKey,
    /// Pre-captured cookies.
    Cookie,
    /// Opaque session token.
    SessionToken,
    /// Password plus a second factor.
    TwoFactor,
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Allocated, authentication not started.
    Created,
    /// Authentication in flight.
    Authenticating,
    /// Authenticated and usable.
    Active,
    /// Past its expiry time.
    Expired,
    /// Authentication failed.
    Failed,
    /// Explicitly logged out.
    LoggedOut,
}

/// Authenticated state produced by a successful login.
///
/// What an [`crate::AuthHandler`] hands back after authenticating; the
/// manager folds it into the pooled session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionArtifacts {
    /// Cookies captured from the driver after login.
    #[serde(default)]
    pub cookies: Vec<serde_json::Value>,
    /// localStorage snapshot.
    #[serde(default)]
    pub local_storage: HashMap<String, String>,
    /// sessionStorage snapshot.
    #[serde(default)]
    pub session_storage: HashMap<String, String>,
    /// Bearer/refresh tokens extracted during login.
    #[serde(default)]
    pub auth_tokens: HashMap<String, String>,
    /// When the authenticated state expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A pooled authenticated session on one external service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedSession {
    /// Unique session id.
    pub id: String,
    /// The service this session is authenticated against.
    pub service: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Cookies captured at login.
    #[serde(default)]
    pub cookies: Vec<serde_json::Value>,
    /// localStorage snapshot.
    #[serde(default)]
    pub local_storage: HashMap<String, String>,
    /// sessionStorage snapshot.
    #[serde(default)]
    pub session_storage: HashMap<String, String>,
    /// Tokens extracted during login.
    #[serde(default)]
    pub auth_tokens: HashMap<String, String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time the session was handed out or used.
    pub last_activity: DateTime<Utc>,
    /// When the session expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
    /// Id of the automation driver session currently bound, if any.
    pub automation_session_id: Option<String>,
}

impl AuthenticatedSession {
    /// Create a fresh session for `service` in the `Created` state.
    pub fn new(service: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("sess_{}", Uuid::new_v4().simple()),
            service: service.into(),
            status: SessionStatus::Created,
            cookies: Vec::new(),
            local_storage: HashMap::new(),
            session_storage: HashMap::new(),
            auth_tokens: HashMap::new(),
            created_at: now,
            last_activity: now,
            expires_at: None,
            automation_session_id: None,
        }
    }

    /// Fold login artifacts into this session and mark it active.
    pub fn activate(&mut self, artifacts: SessionArtifacts) {
        self.cookies = artifacts.cookies;
        self.local_storage = artifacts.local_storage;
        self.session_storage = artifacts.session_storage;
        self.auth_tokens = artifacts.auth_tokens;
        self.expires_at = artifacts.expires_at;
        self.status = SessionStatus::Active;
        self.last_activity = Utc::now();
    }

    /// Whether the session is usable. An active session found past its
    /// expiry flips to `Expired` here.
    pub fn is_active(&mut self) -> bool {
        if self.status == SessionStatus::Active {
            if let Some(expires_at) = self.expires_at {
                if Utc::now() >= expires_at {
                    self.status = SessionStatus::Expired;
                    return false;
                }
            }
            return true;
        }
        false
    }

    /// Record activity on this session.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
