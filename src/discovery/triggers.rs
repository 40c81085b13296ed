//! Trigger discovery: enumerate and classify top-level interactive nav
//! elements inside a chosen header container.

use super::header::HeaderCandidate;
use super::CandidateSource;
use crate::config::EngineConfig;
use crate::dom;
use crate::driver::PageHandle;
use crate::hints::TogglerPattern;
use crate::site::keywords::KeywordSet;
use crate::types::InteractionMode;
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// A top-level interactive element suspected of revealing a hidden panel.
#[derive(Debug, Clone)]
pub struct Toggler {
    pub text: String,
    /// Path from the header root (cacheable across runs).
    pub relative_selector: String,
    /// Full selector usable directly against the page.
    pub selector: String,
    pub source: CandidateSource,
    /// Direct destination if the trigger is itself a link.
    pub href: Option<String>,
    /// Interaction known to open this trigger, learned from a prior run.
    pub preferred_interaction: Option<InteractionMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerScanResponse {
    found: bool,
    triggers: Vec<RawTrigger>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrigger {
    text: String,
    relative_selector: String,
    #[serde(default)]
    has_popup: bool,
    #[serde(default)]
    has_expanded: bool,
    #[serde(default)]
    class_name: String,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeHit {
    panels: Vec<serde_json::Value>,
}

/// Discovers and classifies togglers in a header container.
pub struct TriggerDiscoverer<'a> {
    keywords: &'a KeywordSet,
    config: &'a EngineConfig,
}

impl<'a> TriggerDiscoverer<'a> {
    pub fn new(keywords: &'a KeywordSet, config: &'a EngineConfig) -> Self {
        Self { keywords, config }
    }

    /// Classify togglers in `header`, capped at the configured sample size.
    ///
    /// Cached patterns that still resolve to a live element are taken first
    /// and win over freshly discovered togglers with the same text.
    pub async fn discover(
        &self,
        page: &dyn PageHandle,
        header: &HeaderCandidate,
        cached_patterns: &[TogglerPattern],
    ) -> Result<Vec<Toggler>> {
        let mut togglers: Vec<Toggler> = Vec::new();

        for pattern in cached_patterns {
            if togglers.len() >= self.config.max_trigger_samples {
                break;
            }
            if self.is_live(page, &pattern.selector).await? {
                togglers.push(Toggler {
                    text: pattern.text.clone(),
                    relative_selector: pattern.selector.clone(),
                    selector: pattern.selector.clone(),
                    source: CandidateSource::Cache,
                    href: None,
                    preferred_interaction: pattern.interaction,
                });
            } else {
                debug!(selector = %pattern.selector, "cached toggler no longer resolves");
            }
        }

        let params = json!({
            "containerSelector": header.selector,
            "maxRaw": 50,
        });
        let response = dom::eval_call::<TriggerScanResponse>(
            page,
            dom::TRIGGER_SCAN_JS,
            &params,
            self.config.eval_timeout_ms,
        )
        .await?;

        let raw_triggers = match response {
            Some(r) if r.found => r.triggers,
            _ => return Ok(togglers),
        };

        for raw in raw_triggers {
            if togglers.len() >= self.config.max_trigger_samples {
                break;
            }
            if !self.qualifies(&raw) {
                continue;
            }
            // Cached togglers of the same text win.
            if togglers
                .iter()
                .any(|t| t.text.eq_ignore_ascii_case(&raw.text))
            {
                continue;
            }
            let selector = if raw.relative_selector.is_empty() {
                header.selector.clone()
            } else {
                format!("{} > {}", header.selector, raw.relative_selector)
            };
            togglers.push(Toggler {
                text: raw.text,
                relative_selector: raw.relative_selector,
                selector,
                source: CandidateSource::Discovery,
                href: raw.href,
                preferred_interaction: None,
            });
        }

        Ok(togglers)
    }

    /// Classification rule: reject utility/degenerate text, then accept on a
    /// department keyword, an interaction affordance, or — last resort inside
    /// a confirmed nav container — a reasonable text length.
    fn qualifies(&self, raw: &RawTrigger) -> bool {
        let text = raw.text.trim();
        let len = text.chars().count();
        if len < 2 || len > 40 {
            return false;
        }
        if self.keywords.is_utility(text) {
            return false;
        }
        if self.keywords.matches_department(text) {
            return true;
        }
        if raw.has_popup || raw.has_expanded || self.keywords.has_dropdown_class(&raw.class_name) {
            return true;
        }
        (3..=30).contains(&len)
    }

    /// Whether a cached selector still resolves to a visible element.
    async fn is_live(&self, page: &dyn PageHandle, selector: &str) -> Result<bool> {
        let params = json!({ "panelSelectors": [selector] });
        let hit = dom::eval_call::<ProbeHit>(
            page,
            dom::PANEL_PROBE_JS,
            &params,
            self.config.eval_timeout_ms,
        )
        .await?;
        Ok(hit.map(|h| !h.panels.is_empty()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::header::HeaderBounds;
    use crate::dom::markers;
    use crate::driver::scripted::ScriptedPage;

    fn header() -> HeaderCandidate {
        HeaderCandidate {
            selector: "header > nav".into(),
            source: CandidateSource::Discovery,
            score: 20.0,
            bounds: HeaderBounds { top: 0.0, width: 1900.0, height: 80.0 },
            interactive_count: 10,
        }
    }

    fn raw(text: &str) -> serde_json::Value {
        json!({
            "text": text,
            "relativeSelector": "ul:nth-child(1) > li:nth-child(1) > a:nth-child(1)",
            "hasPopup": false,
            "hasExpanded": false,
            "className": "",
            "href": "/x",
            "top": 10.0,
            "left": 10.0,
        })
    }

    fn scan(triggers: Vec<serde_json::Value>) -> serde_json::Value {
        json!({"found": true, "triggers": triggers})
    }

    #[tokio::test]
    async fn test_department_and_affordance_qualify() {
        let mut popup = raw("Mystery");
        popup["hasPopup"] = json!(true);
        let page = ScriptedPage::new("https://x.com").respond(
            markers::TRIGGER_SCAN,
            scan(vec![raw("Women"), popup, raw("Sign In"), raw("x")]),
        );

        let config = EngineConfig::default();
        let discoverer = TriggerDiscoverer::new(KeywordSet::builtin(), &config);
        let togglers = discoverer.discover(&page, &header(), &[]).await.unwrap();

        let texts: Vec<&str> = togglers.iter().map(|t| t.text.as_str()).collect();
        assert!(texts.contains(&"Women"));
        assert!(texts.contains(&"Mystery")); // affordance
        assert!(!texts.contains(&"Sign In")); // utility
        assert!(!texts.contains(&"x")); // too short
    }

    #[tokio::test]
    async fn test_only_utility_links_yields_nothing() {
        let page = ScriptedPage::new("https://x.com").respond(
            markers::TRIGGER_SCAN,
            scan(vec![raw("Sign In"), raw("Cart"), raw("Help"), raw("Track Order")]),
        );

        let config = EngineConfig::default();
        let discoverer = TriggerDiscoverer::new(KeywordSet::builtin(), &config);
        let togglers = discoverer.discover(&page, &header(), &[]).await.unwrap();
        assert!(togglers.is_empty());
    }

    #[tokio::test]
    async fn test_sample_cap() {
        let many: Vec<serde_json::Value> = (0..30)
            .map(|i| {
                let mut t = raw(&format!("Department {i}"));
                t["relativeSelector"] = json!(format!("li:nth-child({i})"));
                t
            })
            .collect();
        let page =
            ScriptedPage::new("https://x.com").respond(markers::TRIGGER_SCAN, scan(many));

        let config = EngineConfig::default();
        let discoverer = TriggerDiscoverer::new(KeywordSet::builtin(), &config);
        let togglers = discoverer.discover(&page, &header(), &[]).await.unwrap();
        assert_eq!(togglers.len(), config.max_trigger_samples);
    }

    #[tokio::test]
    async fn test_cached_pattern_preferred_when_live() {
        let page = ScriptedPage::new("https://x.com")
            // Liveness check for the cached selector finds the element.
            .respond(markers::PANEL_PROBE, json!({"panels": [{"selector": "nav a"}]}))
            .respond(markers::TRIGGER_SCAN, scan(vec![raw("Women")]));

        let cached = vec![TogglerPattern {
            text: "Women".into(),
            selector: "header > nav > ul > li:nth-child(3) > a".into(),
            interaction: Some(InteractionMode::Click),
        }];

        let config = EngineConfig::default();
        let discoverer = TriggerDiscoverer::new(KeywordSet::builtin(), &config);
        let togglers = discoverer.discover(&page, &header(), &cached).await.unwrap();

        // One "Women" entry only, and it is the cached one.
        let women: Vec<&Toggler> = togglers.iter().filter(|t| t.text == "Women").collect();
        assert_eq!(women.len(), 1);
        assert_eq!(women[0].source, CandidateSource::Cache);
        assert_eq!(women[0].preferred_interaction, Some(InteractionMode::Click));
    }
}
