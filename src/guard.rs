//! Route protection: the caller side of the access gate.
//!
//! The gate only decides. `RouteGuard` acts on the decision the way the
//! console does: render, wait, or notify and redirect.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::audit::{AuditEvent, AuditEventKind, AuditOutcome, AuditTrail};
use crate::config::RouteConfig;
use crate::gate::{AccessGate, GateDecision};
use crate::requirement::AccessRequirement;
use crate::session::PrincipalProvider;

/// A dismissable message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short heading
    pub title: &'static str,
    /// Body text; generic enough to reveal nothing about accounts
    pub message: String,
}

impl Notice {
    /// Creates a notice.
    pub fn new(title: &'static str, message: impl Into<String>) -> Self {
        Self {
            title,
            message: message.into(),
        }
    }

    /// The notice shown when a route is denied.
    pub fn access_denied() -> Self {
        Self::new(
            "Access denied",
            "You do not have permission to access this page.",
        )
    }
}

/// UI-layer sink for notices and navigation.
pub trait Navigator {
    /// Shows `notice` to the user.
    fn notify(&self, notice: Notice);

    /// Navigates to `path`.
    fn redirect(&self, path: &str);
}

/// A route that requires a permission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtectedRoute {
    /// Route path, matched exactly
    pub path: String,
    /// What the principal needs
    #[serde(flatten)]
    pub requirement: AccessRequirement,
    /// Where to send a denied user instead of the global fallback
    #[serde(default)]
    pub redirect_to: Option<String>,
}

impl ProtectedRoute {
    /// Protects `path` with `requirement`.
    pub fn new(path: impl Into<String>, requirement: impl Into<AccessRequirement>) -> Self {
        Self {
            path: path.into(),
            requirement: requirement.into(),
            redirect_to: None,
        }
    }

    /// Overrides the redirect target for this route.
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }
}

/// What the view layer should do for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Render the route
    Render,
    /// Show a neutral loading state
    Loading,
    /// The user was sent elsewhere
    Redirected {
        /// Target path
        to: String,
    },
}

/// Applies access requirements to routes.
///
/// Paths that were never protected render for everyone.
///
/// # Examples
///
/// ```
/// use access_core::{
///     AccessRequirement, Navigator, Notice, Principal, ProtectedRoute, RouteGuard,
///     RouteOutcome, SessionSnapshot,
/// };
///
/// struct Ignore;
/// impl Navigator for Ignore {
///     fn notify(&self, _notice: Notice) {}
///     fn redirect(&self, _path: &str) {}
/// }
///
/// let guard = RouteGuard::new("/dashboard", "/login").protect(ProtectedRoute::new(
///     "/usuarios",
///     AccessRequirement::permission("security.users.view").with_nav_item("security", "users"),
/// ));
///
/// let viewer = Principal::new("1", "ana@example.com").with_permission("security.users.view");
/// let outcome = guard.check("/usuarios", &SessionSnapshot::signed_in(viewer), &Ignore);
///
/// assert_eq!(outcome, RouteOutcome::Redirected { to: "/dashboard".to_string() });
/// ```
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: BTreeMap<String, ProtectedRoute>,
    fallback: String,
    login: String,
    audit: Option<Arc<AuditTrail>>,
}

impl RouteGuard {
    /// Creates a guard with no protected routes.
    pub fn new(fallback: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            routes: BTreeMap::new(),
            fallback: fallback.into(),
            login: login.into(),
            audit: None,
        }
    }

    /// Builds a guard from configuration.
    pub fn from_config(config: &RouteConfig) -> Self {
        config
            .protected
            .iter()
            .cloned()
            .fold(Self::new(&config.fallback, &config.login), Self::protect)
    }

    /// Adds or replaces a protected route.
    pub fn protect(mut self, route: ProtectedRoute) -> Self {
        self.routes.insert(route.path.clone(), route);
        self
    }

    /// Records denials to `trail`.
    pub fn with_audit(mut self, trail: Arc<AuditTrail>) -> Self {
        self.audit = Some(trail);
        self
    }

    /// The requirement for `path`, if it is protected.
    pub fn requirement(&self, path: &str) -> Option<&AccessRequirement> {
        self.routes.get(path).map(|route| &route.requirement)
    }

    /// Decides what to do for `path` and performs any redirect.
    ///
    /// A denied principal gets an access-denied notice and is sent to the
    /// route's redirect target, or the fallback. A visitor with no session
    /// is sent to the login route without a notice. Nothing is shown while
    /// the session is loading.
    pub fn check(
        &self,
        path: &str,
        provider: &impl PrincipalProvider,
        navigator: &impl Navigator,
    ) -> RouteOutcome {
        let Some(route) = self.routes.get(path) else {
            return RouteOutcome::Render;
        };

        let snapshot = provider.snapshot();
        let report = AccessGate::explain(snapshot.principal(), snapshot.is_loading(), &route.requirement);

        match report.decision() {
            GateDecision::Pending => RouteOutcome::Loading,
            GateDecision::Allowed => RouteOutcome::Render,
            GateDecision::Denied => {
                let Some(principal) = snapshot.principal() else {
                    tracing::debug!(path = %path, "no session, redirecting to login");
                    navigator.redirect(&self.login);
                    return RouteOutcome::Redirected {
                        to: self.login.clone(),
                    };
                };

                let to = route
                    .redirect_to
                    .clone()
                    .unwrap_or_else(|| self.fallback.clone());
                let reasons = report
                    .reasons()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");

                tracing::info!(principal = %principal.id, path = %path, reasons = %reasons, "route denied");
                if let Some(trail) = &self.audit {
                    trail.record(
                        AuditEvent::new(
                            trail.next_request_id(),
                            Utc::now(),
                            Some(principal.email.as_str()),
                            AuditEventKind::Authorization,
                            AuditOutcome::Denied,
                        )
                        .with_resource(path)
                        .with_reason(reasons),
                    );
                }

                navigator.notify(Notice::access_denied());
                navigator.redirect(&to);
                RouteOutcome::Redirected { to }
            }
        }
    }
}
