//! Per-domain interaction overrides.
//!
//! Some sites need extra coaxing: a settle delay before a hover registers, a
//! mouse-off between consecutive hovers so the previous panel dismisses, or a
//! behavioral warm-up because the domain runs bot detection. These are
//! documented, domain-keyed overrides — immutable configuration injected at
//! construction, never branches scattered through logic.

use serde::Deserialize;
use std::collections::HashMap;

const SITE_QUIRKS_JSON: &str = include_str!("site_quirks.json");

/// Interaction overrides for one domain.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteQuirk {
    /// Move the pointer to a neutral spot between hovers so the previous
    /// panel actually dismisses.
    pub needs_mouse_off_between_hovers: bool,
    /// How long to wait after moving the pointer off, in ms.
    pub mouse_off_delay_ms: u64,
    /// Extra settle time after a hover before polling starts, in ms.
    pub hover_settle_ms: u64,
    /// Domain is on the anti-bot watch-list; run the behavioral warm-up.
    pub anti_bot_watch: bool,
}

impl Default for SiteQuirk {
    fn default() -> Self {
        Self {
            needs_mouse_off_between_hovers: false,
            mouse_off_delay_ms: 120,
            hover_settle_ms: 0,
            anti_bot_watch: false,
        }
    }
}

/// Domain-keyed table of [`SiteQuirk`]s.
#[derive(Debug, Clone, Default)]
pub struct SiteQuirkTable {
    entries: HashMap<String, SiteQuirk>,
}

impl SiteQuirkTable {
    /// The embedded default table.
    pub fn builtin() -> Self {
        let entries: HashMap<String, SiteQuirk> =
            serde_json::from_str(SITE_QUIRKS_JSON).expect("embedded quirk table is valid JSON");
        Self { entries }
    }

    /// An empty table, for callers that supply their own entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace the quirk for a domain.
    pub fn insert(&mut self, domain: &str, quirk: SiteQuirk) {
        self.entries.insert(normalize_domain(domain), quirk);
    }

    /// Quirk for a domain, falling back to defaults. Subdomains inherit the
    /// registrable parent's entry ("shop.nike.com" gets "nike.com").
    pub fn lookup(&self, domain: &str) -> SiteQuirk {
        let domain = normalize_domain(domain);
        if let Some(quirk) = self.entries.get(&domain) {
            return quirk.clone();
        }
        // Walk up the label chain: a.b.example.com -> b.example.com -> example.com
        let mut rest = domain.as_str();
        while let Some(idx) = rest.find('.') {
            rest = &rest[idx + 1..];
            if !rest.contains('.') {
                break; // bare TLD, stop
            }
            if let Some(quirk) = self.entries.get(rest) {
                return quirk.clone();
            }
        }
        SiteQuirk::default()
    }
}

fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .to_lowercase()
        .trim_start_matches("www.")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses() {
        let table = SiteQuirkTable::builtin();
        let quirk = table.lookup("nike.com");
        assert!(quirk.needs_mouse_off_between_hovers);
        assert_eq!(quirk.mouse_off_delay_ms, 250);
    }

    #[test]
    fn test_unknown_domain_gets_defaults() {
        let table = SiteQuirkTable::builtin();
        let quirk = table.lookup("tiny-shop.example");
        assert!(!quirk.needs_mouse_off_between_hovers);
        assert!(!quirk.anti_bot_watch);
        assert_eq!(quirk.mouse_off_delay_ms, 120);
    }

    #[test]
    fn test_subdomain_inherits() {
        let table = SiteQuirkTable::builtin();
        assert!(table.lookup("www.nike.com").needs_mouse_off_between_hovers);
        assert!(table.lookup("shop.nike.com").needs_mouse_off_between_hovers);
    }

    #[test]
    fn test_insert_overrides() {
        let mut table = SiteQuirkTable::empty();
        table.insert(
            "example.com",
            SiteQuirk {
                hover_settle_ms: 500,
                ..SiteQuirk::default()
            },
        );
        assert_eq!(table.lookup("example.com").hover_settle_ms, 500);
    }
}
