//! In-memory audit trail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::AuditEvent;

/// Records audit events in order and emits each one through `tracing`.
///
/// The trail is `Sync` so one instance can be shared (behind an `Arc`) by
/// the session, the login flow and the route guard.
///
/// # Example
///
/// ```
/// use access_core::audit::{AuditEvent, AuditEventKind, AuditOutcome, AuditTrail};
/// use chrono::Utc;
///
/// let trail = AuditTrail::new();
/// let request_id = trail.next_request_id();
/// trail.record(AuditEvent::new(
///     request_id.as_str(),
///     Utc::now(),
///     Some("a@x.com"),
///     AuditEventKind::Authentication,
///     AuditOutcome::Success,
/// ));
///
/// assert_eq!(trail.len(), 1);
/// assert_eq!(trail.events()[0].request_id(), request_id);
/// ```
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: Mutex<Vec<AuditEvent>>,
    next_id: AtomicU64,
}

impl AuditTrail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a correlation id, unique within this trail.
    pub fn next_request_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req-{}", n)
    }

    /// Emits `event` as a structured `tracing` event and stores it.
    pub fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "access_audit",
            request_id = %event.request_id(),
            kind = %event.kind(),
            outcome = %event.outcome(),
            principal = ?event.principal(),
            resource = ?event.resource(),
            reason = ?event.reason(),
            "audit event"
        );
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Returns a snapshot of recorded events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
