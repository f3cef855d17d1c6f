use std::fmt;

use serde::Deserialize;

/// What a protected view requires from the principal.
///
/// A requirement always names one permission and may additionally name a
/// navigation item that must be visible. Requirements are supplied by the
/// caller per view; they are never stored on the principal.
///
/// # Examples
///
/// ```
/// use access_core::AccessRequirement;
///
/// let req = AccessRequirement::permission("security.users.view")
///     .with_nav_item("security", "users");
///
/// assert_eq!(req.required_permission(), "security.users.view");
/// assert_eq!(req.required_nav_item().map(|n| n.item.as_str()), Some("users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessRequirement {
    #[serde(rename = "permission")]
    required_permission: String,
    #[serde(rename = "nav_item", default)]
    required_nav_item: Option<NavItem>,
}

impl AccessRequirement {
    /// Requires a single permission.
    pub fn permission(permission: impl Into<String>) -> Self {
        Self {
            required_permission: permission.into(),
            required_nav_item: None,
        }
    }

    /// Additionally requires `section`/`item` to be visible.
    pub fn with_nav_item(mut self, section: impl Into<String>, item: impl Into<String>) -> Self {
        self.required_nav_item = Some(NavItem::new(section, item));
        self
    }

    /// The permission name that must be granted.
    pub fn required_permission(&self) -> &str {
        &self.required_permission
    }

    /// The navigation item that must be visible, if any.
    pub fn required_nav_item(&self) -> Option<&NavItem> {
        self.required_nav_item.as_ref()
    }

    /// A blank permission name can never be satisfied.
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.required_permission.trim().is_empty()
    }
}

impl From<&str> for AccessRequirement {
    fn from(permission: &str) -> Self {
        AccessRequirement::permission(permission)
    }
}

impl From<String> for AccessRequirement {
    fn from(permission: String) -> Self {
        AccessRequirement::permission(permission)
    }
}

impl fmt::Display for AccessRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "permission '{}'", self.required_permission)?;
        if let Some(nav) = &self.required_nav_item {
            write!(f, " + nav {}", nav)?;
        }
        Ok(())
    }
}

/// A navigation entry addressed by section and item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct NavItem {
    /// Section name, e.g. `security`
    pub section: String,
    /// Item name within the section, e.g. `users`
    pub item: String,
}

impl NavItem {
    /// Creates a navigation item reference.
    pub fn new(section: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for NavItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_permission_is_not_well_formed() {
        assert!(!AccessRequirement::permission("").is_well_formed());
        assert!(!AccessRequirement::permission("   ").is_well_formed());
        assert!(AccessRequirement::permission("security.audit.view").is_well_formed());
    }

    #[test]
    fn display_includes_nav_item() {
        let req = AccessRequirement::permission("security.roles.view").with_nav_item("security", "roles");
        assert_eq!(
            req.to_string(),
            "permission 'security.roles.view' + nav security.roles"
        );
    }

    #[test]
    fn from_str_has_no_nav_item() {
        let req: AccessRequirement = "security.users.view".into();
        assert!(req.required_nav_item().is_none());
    }
}
