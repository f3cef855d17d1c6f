//! Sign-in protocol: throttle check, credential exchange, attempt record.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::audit::{AuditEvent, AuditEventKind, AuditOutcome, AuditTrail};
use crate::clock::{Clock, SystemClock};
use crate::guard::Notice;
use crate::secret::{AccessToken, Password};
use crate::throttle::{AttemptStore, LoginThrottle};

/// The external authentication backend.
#[async_trait]
pub trait AuthExchange: Send + Sync {
    /// Checks `email`/`password` and returns a grant on success.
    async fn authenticate(&self, email: &str, password: &Password)
        -> Result<AuthGrant, AuthFailure>;
}

/// A successful credential check.
#[derive(Debug)]
pub enum AuthGrant {
    /// The backend issued a bearer credential
    Token(AccessToken),
    /// The password was accepted but a second factor is still required
    MfaRequired,
}

/// A failed credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Unknown email or wrong password; the two are not distinguished
    InvalidCredentials,
    /// The backend could not give a verdict
    Unavailable(String),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::InvalidCredentials => write!(f, "invalid credentials"),
            AuthFailure::Unavailable(detail) => write!(f, "authentication unavailable: {}", detail),
        }
    }
}

impl std::error::Error for AuthFailure {}

/// Result of one sign-in attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Signed in; the caller establishes the session with the token
    Authenticated(AccessToken),
    /// Password accepted, second factor pending
    MfaRequired,
    /// Refused locally, the backend was not contacted
    Blocked {
        /// Time left in the lockout, rounded up to whole minutes
        retry_after_minutes: u32,
    },
    /// Wrong email or password
    InvalidCredentials,
    /// The backend could not give a verdict; the attempt was not counted
    Unavailable,
}

impl LoginOutcome {
    /// Returns true when the password was accepted.
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_) | LoginOutcome::MfaRequired)
    }

    /// Message safe to show to the user.
    ///
    /// None of the texts reveal whether the email has an account.
    pub fn user_message(&self) -> String {
        match self {
            LoginOutcome::Authenticated(_) => "Signed in.".to_string(),
            LoginOutcome::MfaRequired => "Enter the verification code to continue.".to_string(),
            LoginOutcome::Blocked {
                retry_after_minutes,
            } => format!(
                "Account temporarily blocked due to multiple failed login attempts. Try again in {} minutes.",
                retry_after_minutes
            ),
            LoginOutcome::InvalidCredentials => "Invalid email or password.".to_string(),
            LoginOutcome::Unavailable => "Login is temporarily unavailable. Try again later.".to_string(),
        }
    }

    /// Notice for the UI layer, for outcomes that need one.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            LoginOutcome::Blocked { .. } => Some(Notice::new("Account blocked", self.user_message())),
            LoginOutcome::InvalidCredentials | LoginOutcome::Unavailable => {
                Some(Notice::new("Login failed", self.user_message()))
            }
            LoginOutcome::Authenticated(_) | LoginOutcome::MfaRequired => None,
        }
    }
}

/// Runs the sign-in protocol around a [`LoginThrottle`].
///
/// 1. A locked email is refused without calling the backend.
/// 2. Otherwise the backend checks the credentials.
/// 3. The verdict is recorded with the throttle. Backend outages are not
///    verdicts and are not recorded.
#[derive(Debug)]
pub struct LoginFlow<S, A, C = SystemClock> {
    throttle: LoginThrottle<S, C>,
    exchange: A,
    audit: Option<Arc<AuditTrail>>,
}

impl<S, A, C> LoginFlow<S, A, C>
where
    S: AttemptStore,
    A: AuthExchange,
    C: Clock,
{
    /// Creates a flow over `throttle` and `exchange`.
    pub fn new(throttle: LoginThrottle<S, C>, exchange: A) -> Self {
        Self {
            throttle,
            exchange,
            audit: None,
        }
    }

    /// Records every outcome to `trail`.
    pub fn with_audit(mut self, trail: Arc<AuditTrail>) -> Self {
        self.audit = Some(trail);
        self
    }

    /// The throttle guarding this flow.
    pub fn throttle(&self) -> &LoginThrottle<S, C> {
        &self.throttle
    }

    /// Attempts to sign `email` in.
    ///
    /// A store that cannot be read does not block the attempt.
    pub async fn sign_in(&self, email: &str, password: &Password) -> LoginOutcome {
        match self.throttle.status(email).await {
            Ok(status) if status.is_blocked() => {
                let retry_after_minutes = status
                    .retry_after_minutes()
                    .unwrap_or_else(|| self.throttle.config().lockout_minutes());
                tracing::info!(email = %email, retry_after_minutes, "login refused, email locked out");
                self.audit(email, AuditEventKind::Lockout, AuditOutcome::Denied, "locked_out");
                return LoginOutcome::Blocked {
                    retry_after_minutes,
                };
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(email = %email, error = %err, "failed to read login attempts, allowing attempt");
            }
        }

        match self.exchange.authenticate(email, password).await {
            Ok(grant) => {
                self.throttle.record_attempt(email, true).await;
                match grant {
                    AuthGrant::Token(token) => {
                        tracing::info!(email = %email, "login succeeded");
                        self.audit(email, AuditEventKind::Authentication, AuditOutcome::Success, "authenticated");
                        LoginOutcome::Authenticated(token)
                    }
                    AuthGrant::MfaRequired => {
                        tracing::info!(email = %email, "login requires second factor");
                        self.audit(email, AuditEventKind::Authentication, AuditOutcome::Success, "mfa_required");
                        LoginOutcome::MfaRequired
                    }
                }
            }
            Err(AuthFailure::InvalidCredentials) => {
                self.throttle.record_attempt(email, false).await;
                tracing::info!(email = %email, "login rejected");
                self.audit(email, AuditEventKind::Authentication, AuditOutcome::Denied, "invalid_credentials");
                LoginOutcome::InvalidCredentials
            }
            Err(err @ AuthFailure::Unavailable(_)) => {
                tracing::error!(email = %email, error = %err, "authentication backend failed");
                self.audit(email, AuditEventKind::Authentication, AuditOutcome::Error, "backend_unavailable");
                LoginOutcome::Unavailable
            }
        }
    }

    fn audit(&self, email: &str, kind: AuditEventKind, outcome: AuditOutcome, reason: &str) {
        if let Some(trail) = &self.audit {
            trail.record(
                AuditEvent::new(trail.next_request_id(), Utc::now(), Some(email), kind, outcome)
                    .with_reason(reason),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ThrottleConfig;
    use chrono::{Duration, TimeZone};
    use crate::throttle::MemoryAttemptStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts one fixed password and counts calls.
    struct StubExchange {
        password: &'static str,
        calls: AtomicUsize,
        down: bool,
    }

    impl StubExchange {
        fn new(password: &'static str) -> Self {
            Self {
                password,
                calls: AtomicUsize::new(0),
                down: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthExchange for StubExchange {
        async fn authenticate(
            &self,
            _email: &str,
            password: &Password,
        ) -> Result<AuthGrant, AuthFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(AuthFailure::Unavailable("503".to_string()));
            }
            if password.expose_secret() == self.password {
                Ok(AuthGrant::Token(AccessToken::from("jwt")))
            } else {
                Err(AuthFailure::InvalidCredentials)
            }
        }
    }

    fn flow(exchange: StubExchange) -> LoginFlow<MemoryAttemptStore, StubExchange> {
        LoginFlow::new(
            LoginThrottle::new(MemoryAttemptStore::new(), ThrottleConfig::default()).unwrap(),
            exchange,
        )
    }

    #[tokio::test]
    async fn good_password_authenticates() {
        let flow = flow(StubExchange::new("s3cret"));
        let outcome = flow.sign_in("a@x.com", &"s3cret".into()).await;

        assert!(matches!(outcome, LoginOutcome::Authenticated(ref t) if t.expose_secret() == "jwt"));
        assert!(outcome.notice().is_none());
    }

    #[tokio::test]
    async fn bad_password_is_generic() {
        let flow = flow(StubExchange::new("s3cret"));
        let outcome = flow.sign_in("a@x.com", &"guess".into()).await;

        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
        assert_eq!(outcome.user_message(), "Invalid email or password.");
    }

    #[tokio::test]
    async fn blocked_email_skips_exchange() {
        let flow = flow(StubExchange::new("s3cret"));
        for _ in 0..5 {
            flow.sign_in("a@x.com", &"guess".into()).await;
        }
        assert_eq!(flow.exchange.calls(), 5);

        let outcome = flow.sign_in("a@x.com", &"s3cret".into()).await;

        assert!(matches!(
            outcome,
            LoginOutcome::Blocked {
                retry_after_minutes: 15
            }
        ));
        assert_eq!(flow.exchange.calls(), 5);
        assert!(outcome.user_message().contains("Try again in 15 minutes"));
        assert_eq!(outcome.notice().map(|n| n.title), Some("Account blocked"));
    }

    #[tokio::test]
    async fn blocked_message_reports_time_left() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let throttle = LoginThrottle::with_clock(
            MemoryAttemptStore::new(),
            Arc::clone(&clock),
            ThrottleConfig::default(),
        )
        .unwrap();
        let flow = LoginFlow::new(throttle, StubExchange::new("s3cret"));
        for _ in 0..5 {
            flow.sign_in("a@x.com", &"guess".into()).await;
        }

        clock.advance(Duration::minutes(10) + Duration::seconds(30));
        let outcome = flow.sign_in("a@x.com", &"s3cret".into()).await;

        assert!(matches!(
            outcome,
            LoginOutcome::Blocked {
                retry_after_minutes: 5
            }
        ));
        assert!(outcome.user_message().contains("Try again in 5 minutes"));

        clock.advance(Duration::minutes(4));
        let outcome = flow.sign_in("a@x.com", &"s3cret".into()).await;
        assert!(matches!(
            outcome,
            LoginOutcome::Blocked {
                retry_after_minutes: 1
            }
        ));
    }

    #[tokio::test]
    async fn backend_outage_is_not_counted() {
        let mut exchange = StubExchange::new("s3cret");
        exchange.down = true;
        let flow = flow(exchange);

        for _ in 0..6 {
            let outcome = flow.sign_in("a@x.com", &"s3cret".into()).await;
            assert!(matches!(outcome, LoginOutcome::Unavailable));
        }

        assert!(flow.throttle().store().is_empty());
        assert!(!flow.throttle().is_blocked("a@x.com").await);
    }

    #[tokio::test]
    async fn outcomes_are_audited() {
        let trail = Arc::new(AuditTrail::new());
        let flow = flow(StubExchange::new("s3cret")).with_audit(Arc::clone(&trail));

        flow.sign_in("a@x.com", &"guess".into()).await;
        flow.sign_in("a@x.com", &"s3cret".into()).await;

        let events = trail.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome(), AuditOutcome::Denied);
        assert_eq!(events[1].outcome(), AuditOutcome::Success);
        assert_ne!(events[0].request_id(), events[1].request_id());
        assert!(events
            .iter()
            .all(|e| !e.to_string().contains("s3cret") && !e.to_string().contains("guess")));
    }
}
