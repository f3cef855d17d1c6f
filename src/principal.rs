//! The authenticated principal as known to the console.
//!
//! A [`Principal`] is populated once after a successful authentication
//! exchange and held by the [`Session`](crate::Session) until logout or
//! until the credential is found to be invalid.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// An authenticated user of the console.
///
/// `permissions` and `nav` default to empty when the backend omits them,
/// which makes every gated route unreachable for that principal.
///
/// # Examples
///
/// ```
/// use access_core::Principal;
///
/// let alice = Principal::new("42", "alice@example.com")
///     .with_permission("security.users.view")
///     .with_nav_item("security", "users", true);
///
/// assert!(alice.permissions.contains("security.users.view"));
/// assert!(alice.nav.is_visible("security", "users"));
/// assert!(!alice.nav.is_visible("security", "audit"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque unique identifier
    pub id: String,
    /// Login email, unique per account
    pub email: String,
    /// Granted permission names
    #[serde(default)]
    pub permissions: PermissionSet,
    /// Navigation visibility flags
    #[serde(default)]
    pub nav: NavVisibility,
}

impl Principal {
    /// Creates a principal with no permissions and nothing visible.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            permissions: PermissionSet::default(),
            nav: NavVisibility::default(),
        }
    }

    /// Grants a permission.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Sets a navigation flag.
    pub fn with_nav_item(
        mut self,
        section: impl Into<String>,
        item: impl Into<String>,
        visible: bool,
    ) -> Self {
        self.nav.set(section, item, visible);
        self
    }
}

/// A set of opaque permission names.
///
/// Permissions are compared by exact membership. There is no hierarchy:
/// `security.users` does not imply `security.users.view`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Returns true if `permission` is granted.
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Grants a permission. Returns false if it was already present.
    pub fn insert(&mut self, permission: impl Into<String>) -> bool {
        self.0.insert(permission.into())
    }

    /// Revokes a permission. Returns false if it was not present.
    pub fn remove(&mut self, permission: &str) -> bool {
        self.0.remove(permission)
    }

    /// Number of granted permissions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates granted permissions in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Two-level navigation visibility: section, then item.
///
/// Lookups fail closed. A section or item that is not present is treated
/// exactly like an explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavVisibility(BTreeMap<String, BTreeMap<String, bool>>);

impl NavVisibility {
    /// Returns the flag for `section`/`item`, `false` when absent.
    pub fn is_visible(&self, section: &str, item: &str) -> bool {
        self.0
            .get(section)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(false)
    }

    /// Sets the flag for `section`/`item`.
    pub fn set(&mut self, section: impl Into<String>, item: impl Into<String>, visible: bool) {
        self.0
            .entry(section.into())
            .or_default()
            .insert(item.into(), visible);
    }

    /// Iterates sections with their item flags, in lexical order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, bool>)> {
        self.0.iter().map(|(name, items)| (name.as_str(), items))
    }
}
