//! Audit trail for sign-in and access decisions.
//!
//! This module provides:
//! - `AuditEvent`: structured record of a security-relevant outcome
//! - `AuditTrail`: thread-safe recorder that also emits each event through
//!   `tracing`
//!
//! Events hold only safe metadata: the email of the principal, the route or
//! permission involved and the outcome. Passwords and tokens never enter an
//! event.

mod event;
mod trail;

pub use event::{AuditEvent, AuditEventKind, AuditOutcome};
pub use trail::AuditTrail;
