use crate::principal::{NavVisibility, Principal};

/// The navigation entries a principal may see.
///
/// Only items flagged `true` are listed, and a section appears only when at
/// least one of its items does.
///
/// # Examples
///
/// ```
/// use access_core::{NavMenu, Principal};
///
/// let principal = Principal::new("1", "ana@example.com")
///     .with_nav_item("security", "users", true)
///     .with_nav_item("security", "audit", false)
///     .with_nav_item("reports", "sales", false);
///
/// let menu = NavMenu::for_principal(&principal);
///
/// assert!(menu.shows("security", "users"));
/// assert!(!menu.shows("security", "audit"));
/// assert!(!menu.shows_section("reports"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavMenu {
    sections: Vec<NavMenuSection>,
}

/// A visible navigation section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavMenuSection {
    /// Section name
    pub name: String,
    /// Visible items, in lexical order
    pub items: Vec<String>,
}

impl NavMenu {
    /// Builds the menu for `principal`.
    pub fn for_principal(principal: &Principal) -> Self {
        Self::from_visibility(&principal.nav)
    }

    /// Builds the menu from raw visibility flags.
    pub fn from_visibility(nav: &NavVisibility) -> Self {
        let sections = nav
            .sections()
            .filter_map(|(name, items)| {
                let items: Vec<String> = items
                    .iter()
                    .filter(|(_, visible)| **visible)
                    .map(|(item, _)| item.clone())
                    .collect();
                (!items.is_empty()).then(|| NavMenuSection {
                    name: name.to_string(),
                    items,
                })
            })
            .collect();

        Self { sections }
    }

    /// Visible sections, in lexical order.
    pub fn sections(&self) -> &[NavMenuSection] {
        &self.sections
    }

    /// Returns true if `section` has at least one visible item.
    pub fn shows_section(&self, section: &str) -> bool {
        self.sections.iter().any(|s| s.name == section)
    }

    /// Returns true if `section`/`item` is listed.
    pub fn shows(&self, section: &str, item: &str) -> bool {
        self.sections
            .iter()
            .any(|s| s.name == section && s.items.iter().any(|i| i == item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_visibility_has_no_sections() {
        let menu = NavMenu::for_principal(&Principal::new("1", "a@x.com"));
        assert!(menu.sections().is_empty());
    }

    #[test]
    fn lists_only_visible_items() {
        let principal = Principal::new("1", "a@x.com")
            .with_nav_item("security", "users", true)
            .with_nav_item("security", "roles", true)
            .with_nav_item("security", "audit", false);

        let menu = NavMenu::for_principal(&principal);

        assert_eq!(
            menu.sections(),
            &[NavMenuSection {
                name: "security".to_string(),
                items: vec!["roles".to_string(), "users".to_string()],
            }]
        );
    }
}
