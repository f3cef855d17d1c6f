//! Audit event schema.

use std::fmt;

use chrono::{DateTime, Utc};

/// Category of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventKind {
    /// A credential check against the authentication backend
    Authentication,
    /// A login refused locally because the email is locked out
    Lockout,
    /// A route or feature access decision
    Authorization,
    /// Session teardown (logout or rejected credential)
    Session,
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEventKind::Authentication => write!(f, "authentication"),
            AuditEventKind::Lockout => write!(f, "lockout"),
            AuditEventKind::Authorization => write!(f, "authorization"),
            AuditEventKind::Session => write!(f, "session"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditOutcome {
    /// The action succeeded
    Success,
    /// The action was refused by policy or by the backend
    Denied,
    /// The action could not be completed because of an infrastructure fault
    Error,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Denied => write!(f, "denied"),
            AuditOutcome::Error => write!(f, "error"),
        }
    }
}

/// A structured audit record.
///
/// # Example
///
/// ```
/// use access_core::audit::{AuditEvent, AuditEventKind, AuditOutcome};
/// use chrono::Utc;
///
/// let event = AuditEvent::new(
///     "req-7",
///     Utc::now(),
///     Some("ana@example.com"),
///     AuditEventKind::Authorization,
///     AuditOutcome::Denied,
/// )
/// .with_resource("/usuarios")
/// .with_reason("missing_permission");
///
/// assert_eq!(event.request_id(), "req-7");
/// assert_eq!(event.principal(), Some("ana@example.com"));
/// assert_eq!(event.resource(), Some("/usuarios"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Correlates the events of one sign-in, route check or session change
    request_id: String,
    at: DateTime<Utc>,
    /// Email of the principal or login identifier; `None` when unknown
    principal: Option<String>,
    kind: AuditEventKind,
    outcome: AuditOutcome,
    /// Route path or permission name involved
    resource: Option<String>,
    /// Machine-readable cause, e.g. `missing_permission`
    reason: Option<String>,
}

impl AuditEvent {
    /// Creates an event with the required fields.
    pub fn new(
        request_id: impl Into<String>,
        at: DateTime<Utc>,
        principal: Option<impl Into<String>>,
        kind: AuditEventKind,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            at,
            principal: principal.map(Into::into),
            kind,
            outcome,
            resource: None,
            reason: None,
        }
    }

    /// Sets the route or permission involved.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets a machine-readable cause.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The correlation identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the action happened.
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// The principal or login identifier, if known.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// The event kind.
    pub fn kind(&self) -> AuditEventKind {
        self.kind
    }

    /// The outcome.
    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    /// The route or permission, if set.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The cause, if set.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[kind={}, outcome={}, request_id={}, at={}, principal={}",
            self.kind,
            self.outcome,
            self.request_id,
            self.at.to_rfc3339(),
            self.principal.as_deref().unwrap_or("<none>")
        )?;

        if let Some(resource) = &self.resource {
            write!(f, ", resource={}", resource)?;
        }
        if let Some(reason) = &self.reason {
            write!(f, ", reason={}", reason)?;
        }

        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn kind_and_outcome_display() {
        assert_eq!(AuditEventKind::Lockout.to_string(), "lockout");
        assert_eq!(AuditEventKind::Authorization.to_string(), "authorization");
        assert_eq!(AuditOutcome::Denied.to_string(), "denied");
    }

    #[test]
    fn display_lists_optional_fields() {
        let event = AuditEvent::new(
            "req-1",
            at(),
            Some("a@x.com"),
            AuditEventKind::Authorization,
            AuditOutcome::Denied,
        )
        .with_resource("/permissoes")
        .with_reason("nav_item_hidden");

        assert_eq!(
            event.to_string(),
            "AuditEvent[kind=authorization, outcome=denied, request_id=req-1, at=2024-03-01T12:00:00+00:00, \
             principal=a@x.com, resource=/permissoes, reason=nav_item_hidden]"
        );
    }

    #[test]
    fn anonymous_principal_displays_none() {
        let event = AuditEvent::new(
            "req-2",
            at(),
            None::<String>,
            AuditEventKind::Session,
            AuditOutcome::Success,
        );

        assert!(event.principal().is_none());
        assert!(event.to_string().contains("principal=<none>"));
    }
}
