//! Session lifecycle and the principal snapshot the gate reads.
//!
//! A [`Session`] is constructed explicitly at application start and passed
//! to whatever needs the current principal. It replaces ambient auth state:
//! there is no global, and every change is published to subscribers so that
//! access decisions are recomputed instead of cached.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use crate::audit::{AuditEvent, AuditEventKind, AuditOutcome, AuditTrail};
use crate::principal::Principal;
use crate::secret::AccessToken;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    principal: Option<Principal>,
    loading: bool,
}

impl SessionSnapshot {
    /// The principal is still being resolved.
    pub fn loading() -> Self {
        Self {
            principal: None,
            loading: true,
        }
    }

    /// Resolved, nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            principal: None,
            loading: false,
        }
    }

    /// Resolved, `principal` signed in.
    pub fn signed_in(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            loading: false,
        }
    }

    /// The signed-in principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns true while the principal is being resolved.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns true once a principal is resolved.
    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.principal.is_some()
    }
}

/// Supplies the current principal snapshot.
pub trait PrincipalProvider {
    /// Returns the latest snapshot.
    fn snapshot(&self) -> SessionSnapshot;
}

impl PrincipalProvider for SessionSnapshot {
    fn snapshot(&self) -> SessionSnapshot {
        self.clone()
    }
}

/// Fetches the principal that owns a credential (the backend's "current
/// user" endpoint).
#[async_trait]
pub trait PrincipalSource: Send + Sync {
    /// Resolves `token` to its principal.
    async fn fetch_principal(&self, token: &AccessToken) -> Result<Principal, SourceError>;
}

/// Failure to resolve a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The credential is invalid or expired
    Unauthorized,
    /// The backend could not answer
    Unavailable(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unauthorized => write!(f, "credential rejected"),
            SourceError::Unavailable(detail) => write!(f, "principal source unavailable: {}", detail),
        }
    }
}

impl std::error::Error for SourceError {}

/// The signed-in state of one console client.
///
/// # Examples
///
/// ```
/// use access_core::{AccessToken, Principal, PrincipalProvider, Session};
///
/// let session = Session::new();
/// assert!(session.snapshot().is_loading());
///
/// session.establish(Principal::new("1", "ana@example.com"), AccessToken::from("jwt"));
/// assert!(session.snapshot().is_authenticated());
///
/// session.teardown();
/// assert!(session.snapshot().principal().is_none());
/// ```
#[derive(Debug)]
pub struct Session {
    state: watch::Sender<SessionSnapshot>,
    token: Mutex<Option<Arc<AccessToken>>>,
    audit: Option<Arc<AuditTrail>>,
}

impl Session {
    /// Creates a session that has not resolved its principal yet.
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionSnapshot::loading());
        Self {
            state,
            token: Mutex::new(None),
            audit: None,
        }
    }

    /// Records logout and invalidation to `trail`.
    pub fn with_audit(mut self, trail: Arc<AuditTrail>) -> Self {
        self.audit = Some(trail);
        self
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// The credential of the current session, if any.
    pub fn token(&self) -> Option<Arc<AccessToken>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Marks the principal as being resolved.
    pub fn begin_loading(&self) {
        self.state.send_modify(|snapshot| snapshot.loading = true);
    }

    /// Installs a freshly authenticated principal and its credential.
    pub fn establish(&self, principal: Principal, token: AccessToken) {
        tracing::info!(principal = %principal.id, "session established");
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(token));
        self.state.send_replace(SessionSnapshot::signed_in(principal));
    }

    /// Ends the session on user logout.
    pub fn teardown(&self) {
        let email = self.clear();
        tracing::info!(principal = ?email, "session ended");
        self.audit(email, AuditOutcome::Success, "logout");
    }

    /// Ends the session because the backend rejected its credential.
    ///
    /// Callers redirect to the login route afterwards.
    pub fn invalidate(&self) {
        let email = self.clear();
        tracing::warn!(principal = ?email, "session credential rejected");
        self.audit(email, AuditOutcome::Denied, "credential_rejected");
    }

    /// Re-resolves the principal from the stored credential.
    ///
    /// Without a credential the session resolves to signed out. A rejected
    /// credential invalidates the session. Any other failure leaves the
    /// session resolved with no principal but keeps the credential so a
    /// later refresh can retry.
    pub async fn refresh(&self, source: &dyn PrincipalSource) -> Result<(), SourceError> {
        let Some(token) = self.token() else {
            self.state.send_replace(SessionSnapshot::signed_out());
            return Ok(());
        };

        self.begin_loading();
        match source.fetch_principal(&token).await {
            Ok(principal) => {
                tracing::debug!(principal = %principal.id, "principal refreshed");
                self.state.send_replace(SessionSnapshot::signed_in(principal));
                Ok(())
            }
            Err(SourceError::Unauthorized) => {
                self.invalidate();
                Err(SourceError::Unauthorized)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to refresh principal");
                self.state.send_replace(SessionSnapshot::signed_out());
                Err(err)
            }
        }
    }

    fn clear(&self) -> Option<String> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        let previous = self.state.send_replace(SessionSnapshot::signed_out());
        previous.principal.map(|p| p.email)
    }

    fn audit(&self, email: Option<String>, outcome: AuditOutcome, reason: &str) {
        if let Some(trail) = &self.audit {
            trail.record(
                AuditEvent::new(
                    trail.next_request_id(),
                    Utc::now(),
                    email,
                    AuditEventKind::Session,
                    outcome,
                )
                .with_reason(reason),
            );
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalProvider for Session {
    fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }
}
