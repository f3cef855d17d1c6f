//! Per-email login attempt records and the lockout state they imply.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Time;

/// Consecutive failed login attempts for one email.
///
/// A missing record is equivalent to `attempts_count == 0` with no
/// `blocked_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Record key
    pub email: String,
    /// Failures since the last successful login
    pub attempts_count: u32,
    /// End of the current lockout window, if one was set
    pub blocked_until: Option<DateTime<Utc>>,
    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

impl LoginAttemptRecord {
    /// Classifies the record at `now` for a threshold of `max_attempts`.
    ///
    /// A persisted lockout window takes precedence over the counter: once
    /// the window has passed, attempts are allowed again even though the
    /// counter is still at or above the threshold. Without a window, a
    /// counter at the threshold is treated as locked until a success.
    pub fn state(&self, now: DateTime<Utc>, max_attempts: u32) -> AttemptState {
        match self.blocked_until {
            Some(until) if until > now => return AttemptState::Locked { until: Some(until) },
            Some(_) if self.attempts_count >= max_attempts => {
                return AttemptState::Cooling {
                    attempts: self.attempts_count,
                }
            }
            None if self.attempts_count >= max_attempts => {
                return AttemptState::Locked { until: None }
            }
            _ => {}
        }

        if self.attempts_count == 0 {
            AttemptState::Clear
        } else {
            AttemptState::Accumulating {
                attempts: self.attempts_count,
            }
        }
    }

    /// Returns true if a new attempt must be refused at `now`.
    pub fn is_blocked_at(&self, now: DateTime<Utc>, max_attempts: u32) -> bool {
        self.state(now, max_attempts).is_blocked()
    }
}

/// Lockout state of one email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// No failures since the last success
    Clear,
    /// Some failures, below the threshold
    Accumulating {
        /// Failures so far
        attempts: u32,
    },
    /// Attempts are refused
    Locked {
        /// End of the window; `None` when only the counter is known
        until: Option<DateTime<Utc>>,
    },
    /// The window has passed but no success has reset the counter yet.
    /// Attempts are allowed; the next failure locks again.
    Cooling {
        /// Failures so far
        attempts: u32,
    },
}

impl AttemptState {
    /// Returns true only for [`AttemptState::Locked`].
    pub fn is_blocked(&self) -> bool {
        matches!(self, AttemptState::Locked { .. })
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Clear => write!(f, "clear"),
            AttemptState::Accumulating { attempts } => write!(f, "accumulating({})", attempts),
            AttemptState::Locked { until: Some(until) } => write!(f, "locked until {}", until),
            AttemptState::Locked { until: None } => write!(f, "locked"),
            AttemptState::Cooling { attempts } => write!(f, "cooling({})", attempts),
        }
    }
}

/// A write to an attempt record.
///
/// Stores apply updates atomically per email with [`AttemptUpdate::apply`],
/// so concurrent failures never lose an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptUpdate {
    /// A successful login: reset an existing record, create nothing
    Success {
        /// Write time
        at: DateTime<Utc>,
    },
    /// A failed login: increment, locking once the threshold is reached
    Failure {
        /// Write time
        at: DateTime<Utc>,
        /// Lockout threshold
        max_attempts: u32,
        /// Window end to persist if this failure reaches the threshold
        lock_until: DateTime<Utc>,
    },
}

impl AttemptUpdate {
    /// Computes the record that replaces `current` for `email`.
    ///
    /// Returns `None` when nothing must be written (a success for an email
    /// that has no record).
    pub fn apply(
        &self,
        email: &str,
        current: Option<&LoginAttemptRecord>,
    ) -> Option<LoginAttemptRecord> {
        match (*self, current) {
            (AttemptUpdate::Success { .. }, None) => None,
            (AttemptUpdate::Success { at }, Some(record)) => Some(LoginAttemptRecord {
                email: record.email.clone(),
                attempts_count: 0,
                blocked_until: None,
                updated_at: at,
            }),
            (
                AttemptUpdate::Failure {
                    at,
                    max_attempts,
                    lock_until,
                },
                current,
            ) => {
                let attempts_count = current
                    .map_or(0, |r| r.attempts_count)
                    .saturating_add(1);
                Some(LoginAttemptRecord {
                    email: email.to_string(),
                    attempts_count,
                    blocked_until: (attempts_count >= max_attempts).then_some(lock_until),
                    updated_at: at,
                })
            }
        }
    }

    pub(crate) fn at(&self) -> Time {
        match *self {
            AttemptUpdate::Success { at } | AttemptUpdate::Failure { at, .. } => at,
        }
    }
}
