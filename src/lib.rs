//! Access gating and login throttling for the Actionsys proposal manager
//! console.
//!
//! This crate owns the two decisions the console makes before talking to
//! its backend:
//! - **Access gating**: may the current principal open a protected view?
//! - **Login throttling**: may this email attempt a login right now?
//!
//! # Core Types
//!
//! - [`AccessGate`]: pure three-state decision (`Pending`, `Allowed`, `Denied`)
//! - [`LoginThrottle`]: per-email lockout over an [`AttemptStore`]
//! - [`LoginFlow`]: the sign-in protocol around the throttle and an [`AuthExchange`]
//! - [`Session`]: explicitly constructed holder of the current [`Principal`]
//! - [`RouteGuard`]: applies gate decisions to routes through a [`Navigator`]
//!
//! Expected conditions (denied, locked out, bad password) are returned as
//! values. Store faults are logged through `tracing` and degrade to the
//! available outcome.
//!
//! # Examples
//!
//! ```
//! use access_core::{AccessGate, AccessRequirement, GateDecision, Principal, SessionSnapshot};
//!
//! let snapshot = SessionSnapshot::signed_in(
//!     Principal::new("1", "ana@example.com")
//!         .with_permission("security.users.view")
//!         .with_nav_item("security", "users", true),
//! );
//!
//! let users = AccessRequirement::permission("security.users.view").with_nav_item("security", "users");
//! assert_eq!(AccessGate::evaluate_snapshot(&snapshot, &users), GateDecision::Allowed);
//!
//! let audit = AccessRequirement::permission("security.audit.view");
//! assert_eq!(AccessGate::evaluate_snapshot(&snapshot, &audit), GateDecision::Denied);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod clock;
mod config;
mod error;
mod gate;
mod guard;
mod login;
mod menu;
mod principal;
mod requirement;
mod secret;
mod session;
mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AccessConfig, RouteConfig, ThrottleConfig};
pub use error::{ConfigError, Error, StoreError, StoreErrorKind};
pub use gate::{AccessGate, DenyReason, GateDecision, GateReport};
pub use guard::{Navigator, Notice, ProtectedRoute, RouteGuard, RouteOutcome};
pub use login::{AuthExchange, AuthFailure, AuthGrant, LoginFlow, LoginOutcome};
pub use menu::{NavMenu, NavMenuSection};
pub use principal::{NavVisibility, PermissionSet, Principal};
pub use requirement::{AccessRequirement, NavItem};
pub use secret::{AccessToken, Password, Secret};
pub use session::{PrincipalProvider, PrincipalSource, Session, SessionSnapshot, SourceError};
pub use throttle::{
    AttemptState, AttemptStore, AttemptUpdate, LoginAttemptRecord, LoginThrottle,
    MemoryAttemptStore, ThrottleStatus,
};

/// Result alias over the crate [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
