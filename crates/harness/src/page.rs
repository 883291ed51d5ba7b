//! Page Object registry.
//!
//! Pages and their elements are declared once in a YAML file and referenced
//! from specs as `$page.element` (selectors) or `$page` (urls), keeping
//! selectors out of individual test specs:
//!
//! ```yaml
//! login:
//!   url: /login
//!   elements:
//!     username: '#user-name'
//!     password: '#password'
//!     submit: 'input[type="submit"]'
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use glasshouse_common::{Error, Result};

/// A single page object: its url and named element selectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageObject {
    /// URL of the page, relative to the base URL
    #[serde(default)]
    pub url: Option<String>,
    /// Named element selectors
    #[serde(default)]
    pub elements: BTreeMap<String, String>,
}

/// Registry of page objects, keyed by page name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRegistry {
    pages: BTreeMap<String, PageObject>,
}

impl PageRegistry {
    /// Parse a registry from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::SpecParse(e.to_string()))
    }

    /// Parse a registry from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| Error::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Number of registered pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Resolve a selector. `$page.element` references are looked up in the
    /// registry; anything else passes through unchanged.
    pub fn resolve(&self, selector: &str) -> Result<String> {
        let Some(reference) = selector.strip_prefix('$') else {
            return Ok(selector.to_string());
        };

        let (page, element) = reference
            .split_once('.')
            .ok_or_else(|| Error::UnknownPageRef(selector.to_string()))?;

        self.pages
            .get(page)
            .and_then(|p| p.elements.get(element))
            .cloned()
            .ok_or_else(|| Error::UnknownPageRef(selector.to_string()))
    }

    /// Resolve a url. `$page` references return the page's declared url;
    /// anything else passes through unchanged.
    pub fn resolve_url(&self, url: &str) -> Result<String> {
        let Some(page) = url.strip_prefix('$') else {
            return Ok(url.to_string());
        };

        self.pages
            .get(page)
            .and_then(|p| p.url.clone())
            .ok_or_else(|| Error::UnknownPageRef(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PageRegistry {
        PageRegistry::from_yaml(
            r#"
login:
  url: /login
  elements:
    username: '#user-name'
    submit: 'input[type="submit"]'
cart:
  url: /cart
  elements:
    badge: '.shopping_cart_badge'
"#,
        )
        .unwrap()
    }

    #[test]
    fn resolves_element_references() {
        let reg = registry();
        assert_eq!(reg.resolve("$login.username").unwrap(), "#user-name");
        assert_eq!(reg.resolve("$cart.badge").unwrap(), ".shopping_cart_badge");
    }

    #[test]
    fn passes_through_plain_selectors() {
        let reg = registry();
        assert_eq!(reg.resolve("#raw.css.selector").unwrap(), "#raw.css.selector");
    }

    #[test]
    fn resolves_page_urls() {
        let reg = registry();
        assert_eq!(reg.resolve_url("$login").unwrap(), "/login");
        assert_eq!(reg.resolve_url("/direct").unwrap(), "/direct");
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let reg = registry();
        assert!(matches!(
            reg.resolve("$login.missing"),
            Err(Error::UnknownPageRef(_))
        ));
        assert!(matches!(
            reg.resolve_url("$nowhere"),
            Err(Error::UnknownPageRef(_))
        ));
    }
}
