use std::fmt;

use crate::{principal::Principal, requirement::AccessRequirement, session::SessionSnapshot};

/// The access gate.
///
/// `AccessGate` decides whether a principal may view a protected feature.
/// It is pure: it reads the snapshot it is given, keeps no cache and has no
/// side effects, so callers re-run it whenever the principal, the loading
/// flag or the requirement changes.
///
/// Notifying the user and redirecting on [`GateDecision::Denied`] is the
/// caller's job (see [`RouteGuard`](crate::RouteGuard)).
///
/// # Examples
///
/// ```
/// use access_core::{AccessGate, AccessRequirement, GateDecision, Principal};
///
/// let principal = Principal::new("1", "ana@example.com")
///     .with_permission("security.users.view")
///     .with_nav_item("security", "users", true);
///
/// let view = AccessRequirement::permission("security.users.view")
///     .with_nav_item("security", "users");
/// let edit = AccessRequirement::permission("security.users.edit")
///     .with_nav_item("security", "users");
///
/// assert_eq!(AccessGate::evaluate(Some(&principal), false, &view), GateDecision::Allowed);
/// assert_eq!(AccessGate::evaluate(Some(&principal), false, &edit), GateDecision::Denied);
/// assert_eq!(AccessGate::evaluate(Some(&principal), true, &edit), GateDecision::Pending);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Decides access for `principal` against `requirement`.
    ///
    /// While `still_loading` is true the result is always
    /// [`GateDecision::Pending`], whatever the other inputs are.
    pub fn evaluate(
        principal: Option<&Principal>,
        still_loading: bool,
        requirement: &AccessRequirement,
    ) -> GateDecision {
        Self::explain(principal, still_loading, requirement).decision
    }

    /// Decides access against the current session snapshot.
    pub fn evaluate_snapshot(
        snapshot: &SessionSnapshot,
        requirement: &AccessRequirement,
    ) -> GateDecision {
        Self::evaluate(snapshot.principal(), snapshot.is_loading(), requirement)
    }

    /// Decides access and reports every check that failed.
    ///
    /// The reasons are meant for diagnostics and audit records. Messages
    /// shown to users must stay generic.
    pub fn explain(
        principal: Option<&Principal>,
        still_loading: bool,
        requirement: &AccessRequirement,
    ) -> GateReport {
        if still_loading {
            return GateReport::pending();
        }

        let Some(principal) = principal else {
            tracing::debug!(
                requirement = %requirement,
                decision = %GateDecision::Denied,
                "no principal for access requirement"
            );
            return GateReport::denied(vec![DenyReason::Unauthenticated]);
        };

        if !requirement.is_well_formed() {
            tracing::debug!(principal = %principal.id, "blank permission in access requirement");
            return GateReport::denied(vec![DenyReason::InvalidRequirement]);
        }

        let mut reasons = Vec::new();

        if !principal
            .permissions
            .contains(requirement.required_permission())
        {
            reasons.push(DenyReason::MissingPermission);
        }

        let has_nav_access = requirement
            .required_nav_item()
            .map_or(true, |nav| principal.nav.is_visible(&nav.section, &nav.item));
        if !has_nav_access {
            reasons.push(DenyReason::NavItemHidden);
        }

        let report = if reasons.is_empty() {
            GateReport::allowed()
        } else {
            GateReport::denied(reasons)
        };

        tracing::debug!(
            principal = %principal.id,
            requirement = %requirement,
            decision = %report.decision,
            "access evaluated"
        );

        report
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateDecision {
    /// The principal is still being resolved; render neither content nor a denial
    Pending,
    /// Every check passed
    Allowed,
    /// At least one check failed, or there is no session
    Denied,
}

impl GateDecision {
    /// Returns true for [`GateDecision::Allowed`].
    pub fn is_allowed(self) -> bool {
        self == GateDecision::Allowed
    }

    /// Returns true for [`GateDecision::Denied`].
    pub fn is_denied(self) -> bool {
        self == GateDecision::Denied
    }

    /// Returns true for [`GateDecision::Pending`].
    pub fn is_pending(self) -> bool {
        self == GateDecision::Pending
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Pending => write!(f, "pending"),
            GateDecision::Allowed => write!(f, "allowed"),
            GateDecision::Denied => write!(f, "denied"),
        }
    }
}

/// Why a check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// No authenticated session
    Unauthenticated,
    /// The requirement names a blank permission
    InvalidRequirement,
    /// The required permission is not granted
    MissingPermission,
    /// The required navigation item is absent or hidden
    NavItemHidden,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated => write!(f, "unauthenticated"),
            DenyReason::InvalidRequirement => write!(f, "invalid_requirement"),
            DenyReason::MissingPermission => write!(f, "missing_permission"),
            DenyReason::NavItemHidden => write!(f, "nav_item_hidden"),
        }
    }
}

/// A decision together with the checks that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    decision: GateDecision,
    reasons: Vec<DenyReason>,
}

impl GateReport {
    fn pending() -> Self {
        Self {
            decision: GateDecision::Pending,
            reasons: Vec::new(),
        }
    }

    fn allowed() -> Self {
        Self {
            decision: GateDecision::Allowed,
            reasons: Vec::new(),
        }
    }

    fn denied(reasons: Vec<DenyReason>) -> Self {
        Self {
            decision: GateDecision::Denied,
            reasons,
        }
    }

    /// The decision.
    pub fn decision(&self) -> GateDecision {
        self.decision
    }

    /// Failed checks; empty unless the decision is `Denied`.
    pub fn reasons(&self) -> &[DenyReason] {
        &self.reasons
    }
}
