//! Per-email login lockout.
//!
//! This module provides:
//! - `LoginThrottle`: decides whether an email may attempt a login and
//!   records attempt outcomes
//! - `LoginAttemptRecord` / `AttemptState`: the persisted counter and the
//!   lockout state it implies
//! - `AttemptStore`: the persistence seam, with an in-memory implementation
//!
//! The throttle favors availability over strictness. A store that cannot be
//! read never blocks a login, and a failed write never fails one; both are
//! logged through `tracing` instead.

mod record;
mod store;

pub use record::{AttemptState, AttemptUpdate, LoginAttemptRecord};
pub use store::{AttemptStore, MemoryAttemptStore};

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::ThrottleConfig;

/// Enforces the lockout policy for repeated failed logins.
///
/// # Examples
///
/// ```
/// use access_core::{LoginThrottle, MemoryAttemptStore, ThrottleConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> access_core::Result<()> {
/// let throttle = LoginThrottle::new(MemoryAttemptStore::new(), ThrottleConfig::default())?;
///
/// for _ in 0..4 {
///     throttle.record_attempt("b@x.com", false).await;
/// }
/// assert!(!throttle.is_blocked("b@x.com").await);
///
/// throttle.record_attempt("b@x.com", false).await;
/// assert!(throttle.is_blocked("b@x.com").await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LoginThrottle<S, C = SystemClock> {
    store: S,
    clock: C,
    config: ThrottleConfig,
}

impl<S: AttemptStore> LoginThrottle<S> {
    /// Creates a throttle that reads wall-clock time.
    ///
    /// Fails if `config` does not pass [`ThrottleConfig::validate`].
    pub fn new(store: S, config: ThrottleConfig) -> crate::Result<Self> {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: AttemptStore, C: Clock> LoginThrottle<S, C> {
    /// Creates a throttle with an explicit time source.
    pub fn with_clock(store: S, clock: C, config: ThrottleConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            clock,
            config,
        })
    }

    /// The active lockout policy.
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns true if a login attempt for `email` must be refused now.
    ///
    /// An email without a record is never blocked. A store error is logged
    /// and reported as "not blocked".
    pub async fn is_blocked(&self, email: &str) -> bool {
        match self.status(email).await {
            Ok(status) => status.is_blocked(),
            Err(err) => {
                tracing::error!(email = %email, error = %err, "failed to read login attempts, allowing attempt");
                false
            }
        }
    }

    /// Records the outcome of an authentication exchange for `email`.
    ///
    /// A success resets an existing record and creates none. A failure
    /// increments the counter and opens a lockout window once the counter
    /// reaches `max_attempts`. Store errors are logged, never returned.
    pub async fn record_attempt(&self, email: &str, success: bool) {
        let now = self.clock.now();
        let update = if success {
            AttemptUpdate::Success { at: now }
        } else {
            AttemptUpdate::Failure {
                at: now,
                max_attempts: self.config.max_attempts,
                lock_until: self.lock_until(now),
            }
        };

        match self.store.upsert(email, update).await {
            Ok(Some(record)) if !success && record.attempts_count == self.config.max_attempts => {
                tracing::warn!(
                    email = %email,
                    attempts = record.attempts_count,
                    blocked_until = ?record.blocked_until,
                    "login locked after repeated failures"
                );
            }
            Ok(Some(record)) if !success && record.blocked_until.is_some() => {
                tracing::warn!(
                    email = %email,
                    attempts = record.attempts_count,
                    blocked_until = ?record.blocked_until,
                    "login locked again"
                );
            }
            Ok(Some(record)) => {
                tracing::debug!(email = %email, success, attempts = record.attempts_count, "login attempt recorded");
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(email = %email, success, error = %err, "failed to record login attempt");
            }
        }
    }

    /// Reports the lockout state of `email`.
    ///
    /// Unlike [`is_blocked`](Self::is_blocked) this surfaces store errors.
    pub async fn status(&self, email: &str) -> crate::Result<ThrottleStatus> {
        let now = self.clock.now();
        let record = self.store.read(email).await?;

        let Some(record) = record else {
            return Ok(ThrottleStatus {
                state: AttemptState::Clear,
                attempts: 0,
                retry_after: None,
            });
        };

        let state = record.state(now, self.config.max_attempts);
        let retry_after = match state {
            AttemptState::Locked { until: Some(until) } => Some(until - now),
            _ => None,
        };

        Ok(ThrottleStatus {
            state,
            attempts: record.attempts_count,
            retry_after,
        })
    }

    fn lock_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.config.lockout_duration())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Lockout state of one email at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStatus {
    /// Classified state
    pub state: AttemptState,
    /// Failures since the last success
    pub attempts: u32,
    /// Remaining lockout, when the window end is known
    pub retry_after: Option<chrono::Duration>,
}

impl ThrottleStatus {
    /// Returns true if attempts are refused.
    pub fn is_blocked(&self) -> bool {
        self.state.is_blocked()
    }

    /// Remaining lockout rounded up to whole minutes, never below 1.
    ///
    /// `None` unless the state is locked with a known window end.
    pub fn retry_after_minutes(&self) -> Option<u32> {
        self.retry_after.map(|left| {
            let secs = left.num_seconds().max(0);
            u32::try_from((secs + 59) / 60).unwrap_or(u32::MAX).max(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{ConfigError, Error, StoreError};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn throttle() -> (
        LoginThrottle<Arc<MemoryAttemptStore>, Arc<ManualClock>>,
        Arc<MemoryAttemptStore>,
        Arc<ManualClock>,
    ) {
        let store = Arc::new(MemoryAttemptStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let throttle = LoginThrottle::with_clock(
            Arc::clone(&store),
            Arc::clone(&clock),
            ThrottleConfig::default(),
        )
        .expect("default config is valid");
        (throttle, store, clock)
    }

    struct BrokenStore;

    #[async_trait]
    impl AttemptStore for BrokenStore {
        async fn read(&self, _email: &str) -> Result<Option<LoginAttemptRecord>, StoreError> {
            Err(StoreError::timeout("read timed out"))
        }

        async fn upsert(
            &self,
            _email: &str,
            _update: AttemptUpdate,
        ) -> Result<Option<LoginAttemptRecord>, StoreError> {
            Err(StoreError::unavailable("connection reset"))
        }
    }

    #[tokio::test]
    async fn unknown_email_is_not_blocked() {
        let (throttle, _, _) = throttle();
        assert!(!throttle.is_blocked("new@x.com").await);

        let status = throttle.status("new@x.com").await.unwrap();
        assert_eq!(status.state, AttemptState::Clear);
    }

    #[tokio::test]
    async fn fifth_failure_locks_for_fifteen_minutes() {
        let (throttle, store, _) = throttle();

        for n in 1..=4 {
            throttle.record_attempt("b@x.com", false).await;
            assert!(!throttle.is_blocked("b@x.com").await, "blocked after {} failures", n);
        }
        throttle.record_attempt("b@x.com", false).await;
        assert!(throttle.is_blocked("b@x.com").await);

        let record = store.read("b@x.com").await.unwrap().unwrap();
        assert_eq!(record.attempts_count, 5);
        assert_eq!(record.blocked_until, Some(t0() + Duration::minutes(15)));

        let status = throttle.status("b@x.com").await.unwrap();
        assert_eq!(status.retry_after, Some(Duration::minutes(15)));
        assert_eq!(status.retry_after_minutes(), Some(15));
    }

    #[tokio::test]
    async fn success_resets_counter() {
        let (throttle, store, _) = throttle();
        for _ in 0..4 {
            throttle.record_attempt("a@x.com", false).await;
        }

        throttle.record_attempt("a@x.com", true).await;

        let record = store.read("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.attempts_count, 0);
        assert_eq!(record.blocked_until, None);
        assert!(!throttle.is_blocked("a@x.com").await);
    }

    #[tokio::test]
    async fn success_without_record_is_noop() {
        let (throttle, store, _) = throttle();
        throttle.record_attempt("a@x.com", true).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn expired_window_reopens_but_keeps_counter() {
        let (throttle, store, clock) = throttle();
        for _ in 0..5 {
            throttle.record_attempt("c@x.com", false).await;
        }
        assert!(throttle.is_blocked("c@x.com").await);

        clock.advance(Duration::minutes(15) + Duration::seconds(1));
        assert!(!throttle.is_blocked("c@x.com").await);
        let status = throttle.status("c@x.com").await.unwrap();
        assert_eq!(status.state, AttemptState::Cooling { attempts: 5 });

        throttle.record_attempt("c@x.com", false).await;
        assert!(throttle.is_blocked("c@x.com").await);

        let record = store.read("c@x.com").await.unwrap().unwrap();
        assert_eq!(record.attempts_count, 6);
        assert_eq!(record.blocked_until, Some(clock.now() + Duration::minutes(15)));
    }

    #[tokio::test]
    async fn counter_without_window_still_blocks() {
        let (throttle, store, _) = throttle();
        store
            .insert(LoginAttemptRecord {
                email: "d@x.com".to_string(),
                attempts_count: 5,
                blocked_until: None,
                updated_at: t0(),
            })
            .unwrap();

        assert!(throttle.is_blocked("d@x.com").await);
    }

    #[tokio::test]
    async fn read_error_fails_open() {
        let throttle = LoginThrottle::new(BrokenStore, ThrottleConfig::default()).unwrap();

        assert!(!throttle.is_blocked("e@x.com").await);
        let err = throttle.status("e@x.com").await.unwrap_err();
        assert!(matches!(err, Error::Store(ref e) if e.message == "read timed out"));
    }

    #[tokio::test]
    async fn write_error_is_swallowed() {
        let throttle = LoginThrottle::new(BrokenStore, ThrottleConfig::default()).unwrap();
        throttle.record_attempt("e@x.com", false).await;
        throttle.record_attempt("e@x.com", true).await;
    }

    #[tokio::test]
    async fn custom_threshold_applies() {
        let store = MemoryAttemptStore::new();
        let config = ThrottleConfig {
            max_attempts: 2,
            lockout_secs: 60,
        };
        let throttle = LoginThrottle::with_clock(store, ManualClock::new(t0()), config).unwrap();

        throttle.record_attempt("f@x.com", false).await;
        assert!(!throttle.is_blocked("f@x.com").await);
        throttle.record_attempt("f@x.com", false).await;
        assert!(throttle.is_blocked("f@x.com").await);

        let record = throttle.store().read("f@x.com").await.unwrap().unwrap();
        assert_eq!(record.blocked_until, Some(t0() + Duration::seconds(60)));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let config = ThrottleConfig {
            max_attempts: 0,
            lockout_secs: 900,
        };
        let err = LoginThrottle::new(MemoryAttemptStore::new(), config).unwrap_err();

        assert!(matches!(
            err,
            Error::Config(ConfigError::Invalid {
                field: "throttle.max_attempts",
                ..
            })
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = ThrottleConfig {
            max_attempts: 5,
            lockout_secs: 0,
        };
        let result = LoginThrottle::with_clock(MemoryAttemptStore::new(), ManualClock::new(t0()), config);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Invalid {
                field: "throttle.lockout_secs",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn smallest_threshold_still_resets_on_success() {
        let config = ThrottleConfig {
            max_attempts: 1,
            lockout_secs: 60,
        };
        let throttle = LoginThrottle::with_clock(MemoryAttemptStore::new(), ManualClock::new(t0()), config).unwrap();

        throttle.record_attempt("g@x.com", false).await;
        assert!(throttle.is_blocked("g@x.com").await);

        throttle.record_attempt("g@x.com", true).await;
        let record = throttle.store().read("g@x.com").await.unwrap().unwrap();
        assert_eq!(record.attempts_count, 0);
        assert!(!throttle.is_blocked("g@x.com").await);
    }
}
