//! Keyword lists driving container/trigger classification.
//!
//! Embedded at compile time; there is no runtime file I/O. The lists are
//! heuristic working sets grown from observed storefronts, not exhaustive
//! vocabularies — classification treats them as signals, never proofs.

use serde::Deserialize;
use std::sync::OnceLock;

const NAV_KEYWORDS_JSON: &str = include_str!("nav_keywords.json");

/// Keyword and selector lists used across discovery.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSet {
    /// Utility-link texts (sign in, cart, help, ...) that disqualify triggers
    /// and, in bulk, whole header candidates.
    pub utility: Vec<String>,
    /// Department/category texts that qualify a trigger outright.
    pub departments: Vec<String>,
    /// Class-name fragments that suggest a dropdown affordance.
    pub dropdown_classes: Vec<String>,
    /// Link texts/hrefs skipped during panel extraction (social, legal).
    pub skip_patterns: Vec<String>,
    /// Container selectors scanned for header candidates.
    pub header_candidates: Vec<String>,
    /// Container selectors where revealed panels are looked for.
    pub mega_menu_containers: Vec<String>,
    /// Container selectors for the mobile nav fallback.
    pub mobile_containers: Vec<String>,
    /// Hamburger-control selectors for the mobile fallback.
    pub hamburger_selectors: Vec<String>,
}

impl KeywordSet {
    /// The embedded default set.
    pub fn builtin() -> &'static KeywordSet {
        static SET: OnceLock<KeywordSet> = OnceLock::new();
        SET.get_or_init(|| {
            serde_json::from_str(NAV_KEYWORDS_JSON).expect("embedded keyword table is valid JSON")
        })
    }

    /// Whether `text` is a utility link (case-insensitive containment).
    pub fn is_utility(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }
        self.utility.iter().any(|kw| lower.contains(kw.as_str()))
    }

    /// Whether `text` names a department. Substring match runs both
    /// directions so "Women" matches "women" and "Shop All Women" alike.
    pub fn matches_department(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }
        self.departments
            .iter()
            .any(|kw| lower.contains(kw.as_str()) || kw.contains(lower.as_str()))
    }

    /// Whether a class attribute hints at a dropdown affordance.
    pub fn has_dropdown_class(&self, class_attr: &str) -> bool {
        let lower = class_attr.to_lowercase();
        self.dropdown_classes
            .iter()
            .any(|kw| lower.contains(kw.as_str()))
    }

    /// Whether a link should be skipped during extraction (social/legal).
    pub fn is_skip(&self, text: &str, href: Option<&str>) -> bool {
        let text_lower = text.to_lowercase();
        let href_lower = href.unwrap_or("").to_lowercase();
        self.skip_patterns
            .iter()
            .any(|kw| text_lower.contains(kw.as_str()) || href_lower.contains(kw.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses() {
        let set = KeywordSet::builtin();
        assert!(!set.utility.is_empty());
        assert!(!set.departments.is_empty());
        assert!(!set.header_candidates.is_empty());
    }

    #[test]
    fn test_utility_matching() {
        let set = KeywordSet::builtin();
        assert!(set.is_utility("Sign In"));
        assert!(set.is_utility("View Cart"));
        assert!(!set.is_utility("Women"));
        assert!(!set.is_utility(""));
    }

    #[test]
    fn test_department_matching_both_directions() {
        let set = KeywordSet::builtin();
        assert!(set.matches_department("Women"));
        assert!(set.matches_department("Shop All Electronics"));
        // Reverse direction: short text contained in a keyword.
        assert!(set.matches_department("new arrival"));
        assert!(!set.matches_department("xyzzy"));
    }

    #[test]
    fn test_skip_matching_on_href() {
        let set = KeywordSet::builtin();
        assert!(set.is_skip("Follow us", Some("https://facebook.com/shop")));
        assert!(set.is_skip("Privacy Policy", None));
        assert!(!set.is_skip("Dresses", Some("/women/dresses")));
    }
}
