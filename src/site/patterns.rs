//! Pattern templates: pre-authored selector sets and choreography for sites
//! that don't need discovery.
//!
//! Templates resolve in three steps: explicit domain registration first, then
//! storefront-platform fingerprints in the page HTML (Shopify, WooCommerce,
//! Magento, BigCommerce), then the universal fallback. Only the first two
//! count as a "registered" match — the pattern strategy skips when all it
//! would have is the universal template, since that is what the generic
//! mega-menu strategy already uses.

use serde::Deserialize;
use std::collections::HashMap;

const PATTERN_TEMPLATES_JSON: &str = include_str!("pattern_templates.json");
const SECTOR_TEMPLATES_JSON: &str = include_str!("sector_templates.json");

/// Selector groups plus hover choreography for one site family.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternTemplate {
    pub name: String,
    /// Selectors for top-level navigation items, in priority order.
    pub main_nav: Vec<String>,
    /// Selectors for revealed dropdown/mega-menu containers.
    pub dropdown_containers: Vec<String>,
    /// Wait after hovering a main item before reading dropdowns, in ms.
    pub hover_delay_ms: u64,
    /// Wait after mouse-off before the next hover, in ms.
    pub dismiss_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct PlatformPattern {
    name: String,
    /// Literal substrings of the page HTML that identify the platform.
    fingerprints: Vec<String>,
    template: PatternTemplate,
}

#[derive(Debug, Clone, Deserialize)]
struct PatternFile {
    universal: PatternTemplate,
    platforms: Vec<PlatformPattern>,
    domains: HashMap<String, PatternTemplate>,
}

/// How a template was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Explicitly registered for this domain.
    Registered,
    /// Matched by platform fingerprint (value is the platform name).
    Platform(String),
    /// Nothing matched; universal fallback.
    Universal,
}

/// Registry of pattern templates.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    universal: PatternTemplate,
    platforms: Vec<PlatformPattern>,
    domains: HashMap<String, PatternTemplate>,
}

impl PatternLibrary {
    /// The embedded default library.
    pub fn builtin() -> Self {
        let file: PatternFile = serde_json::from_str(PATTERN_TEMPLATES_JSON)
            .expect("embedded pattern templates are valid JSON");
        Self {
            universal: file.universal,
            platforms: file.platforms,
            domains: file.domains,
        }
    }

    /// Register a template for a specific domain.
    pub fn register(&mut self, domain: &str, template: PatternTemplate) {
        self.domains
            .insert(domain.trim_start_matches("www.").to_lowercase(), template);
    }

    pub fn universal(&self) -> &PatternTemplate {
        &self.universal
    }

    /// Resolve the template for a domain + page, with its provenance.
    pub fn match_template(&self, domain: &str, html: &str) -> (&PatternTemplate, TemplateSource) {
        let key = domain.trim_start_matches("www.").to_lowercase();
        if let Some(template) = self.domains.get(&key) {
            return (template, TemplateSource::Registered);
        }
        for platform in &self.platforms {
            if platform
                .fingerprints
                .iter()
                .any(|fp| html.contains(fp.as_str()))
            {
                return (
                    &platform.template,
                    TemplateSource::Platform(platform.name.clone()),
                );
            }
        }
        (&self.universal, TemplateSource::Universal)
    }
}

/// A sector's link-collection heuristics.
#[derive(Debug, Clone, Deserialize)]
pub struct SectorTemplate {
    pub name: String,
    /// Page-text markers identifying the sector.
    pub page_markers: Vec<String>,
    /// Department keywords expected in this sector's nav links.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SectorFile {
    sectors: Vec<SectorTemplate>,
}

/// The embedded sector templates.
pub fn builtin_sectors() -> Vec<SectorTemplate> {
    let file: SectorFile = serde_json::from_str(SECTOR_TEMPLATES_JSON)
        .expect("embedded sector templates are valid JSON");
    file.sectors
}

/// Pick the sector whose markers appear most in the page text. Requires at
/// least two distinct marker hits; below that the page gives no signal.
pub fn detect_sector<'a>(sectors: &'a [SectorTemplate], page_text: &str) -> Option<&'a SectorTemplate> {
    let lower = page_text.to_lowercase();
    sectors
        .iter()
        .map(|s| {
            let hits = s
                .page_markers
                .iter()
                .filter(|m| lower.contains(m.as_str()))
                .count();
            (s, hits)
        })
        .filter(|(_, hits)| *hits >= 2)
        .max_by_key(|(_, hits)| *hits)
        .map(|(s, _)| s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses() {
        let lib = PatternLibrary::builtin();
        assert_eq!(lib.universal().name, "universal");
        assert!(!lib.universal().main_nav.is_empty());
        assert!(lib.platforms.len() >= 4);
    }

    #[test]
    fn test_registered_domain_wins() {
        let mut lib = PatternLibrary::builtin();
        lib.register(
            "shop.example.com",
            PatternTemplate {
                name: "example".into(),
                main_nav: vec!["#nav a".into()],
                dropdown_containers: vec![".panel".into()],
                hover_delay_ms: 100,
                dismiss_delay_ms: 80,
            },
        );
        let (template, source) = lib.match_template("shop.example.com", "");
        assert_eq!(template.name, "example");
        assert_eq!(source, TemplateSource::Registered);
    }

    #[test]
    fn test_platform_fingerprint() {
        let lib = PatternLibrary::builtin();
        let html = r#"<script src="https://cdn.shopify.com/s/files/theme.js"></script>"#;
        let (template, source) = lib.match_template("someshop.com", html);
        assert_eq!(template.name, "shopify");
        assert_eq!(source, TemplateSource::Platform("shopify".into()));
    }

    #[test]
    fn test_universal_fallback() {
        let lib = PatternLibrary::builtin();
        let (template, source) = lib.match_template("plain.example", "<html></html>");
        assert_eq!(template.name, "universal");
        assert_eq!(source, TemplateSource::Universal);
    }

    #[test]
    fn test_sector_detection_needs_two_markers() {
        let sectors = builtin_sectors();
        let fashion_text = "Shop the latest clothing and dress styles in our lookbook";
        let detected = detect_sector(&sectors, fashion_text).expect("fashion should match");
        assert_eq!(detected.name, "fashion");

        // One marker is not enough signal.
        assert!(detect_sector(&sectors, "a page mentioning a laptop once").is_none());
    }
}
