//! Core data model: navigation items, strategy results, discovery metadata.
//!
//! Every strategy returns a [`StrategyResult`] for every invocation, including
//! total failure — expected failure modes are encoded as an empty item list
//! plus a `reason` code in the metadata, never as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::driver::ViewportSize;

/// What kind of node a navigation item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A top-level section in the main navigation bar.
    MainSection,
    /// A link revealed inside a dropdown/mega-menu panel.
    DropdownItem,
    /// A nested child below a dropdown item.
    Subcategory,
    /// A link extracted from a mobile nav container or drawer.
    MobileNav,
    /// A dropdown group header that is itself a category (orphan reattachment).
    DropdownCategory,
}

/// Which discovery strategy produced an item or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PatternMatch,
    MegaMenuCapture,
    AdaptiveProbe,
    SectorTemplate,
    FallbackLinks,
    MobileFallback,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::PatternMatch => "pattern_match",
            StrategyKind::MegaMenuCapture => "mega_menu_capture",
            StrategyKind::AdaptiveProbe => "adaptive_probe",
            StrategyKind::SectorTemplate => "sector_template",
            StrategyKind::FallbackLinks => "fallback_links",
            StrategyKind::MobileFallback => "mobile_fallback",
        }
    }
}

/// Which interaction mode opens panels on a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Hover,
    Click,
    /// Some triggers open on hover, others on click.
    Mixed,
}

/// A single discovered navigation node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationItem {
    /// Display text. Never empty.
    pub name: String,
    /// Absolute URL, if the node is a link. `None` for pure toggles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Locator that found the element, for diagnostics.
    pub selector: String,
    pub kind: ItemKind,
    /// Name of the owning trigger, if this is a revealed child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// 1 = top-level, 2 = revealed child.
    pub hierarchy_level: u8,
    pub discovered_via: StrategyKind,
    /// Mega-menu column index, when the panel had column structure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Nearest group heading inside the panel column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
    /// Numeric category id derived from the URL query string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
}

impl NavigationItem {
    /// A bare top-level item with no mega-menu metadata.
    pub fn top_level(
        name: impl Into<String>,
        url: Option<String>,
        selector: impl Into<String>,
        kind: ItemKind,
        via: StrategyKind,
    ) -> Self {
        Self {
            name: name.into(),
            url,
            selector: selector.into(),
            kind,
            parent: None,
            hierarchy_level: 1,
            discovered_via: via,
            column: None,
            group_title: None,
            category_id: None,
        }
    }

    /// A revealed child item under `parent`.
    pub fn child_of(
        parent: &str,
        name: impl Into<String>,
        url: Option<String>,
        selector: impl Into<String>,
        via: StrategyKind,
    ) -> Self {
        Self {
            name: name.into(),
            url,
            selector: selector.into(),
            kind: ItemKind::DropdownItem,
            parent: Some(parent.to_string()),
            hierarchy_level: 2,
            discovered_via: via,
            column: None,
            group_title: None,
            category_id: None,
        }
    }
}

/// Reason codes reported in [`ResultMetadata::reason`] for empty results.
pub mod reason {
    pub const NO_HEADER_CONTAINERS: &str = "no_header_containers";
    pub const NO_TOGGLERS_FOUND: &str = "no_togglers_found";
    pub const NO_PANELS_REVEALED: &str = "no_panels_revealed";
    pub const NO_REGISTERED_TEMPLATE: &str = "no_registered_template";
    pub const TEMPLATE_YIELDED_NOTHING: &str = "template_yielded_nothing";
    pub const NO_NAV_BAR: &str = "no_nav_bar";
    pub const NO_SECTOR_MATCH: &str = "no_sector_match";
    pub const NO_LINKS_FOUND: &str = "no_links_found";
    pub const MOBILE_FALLBACK_FAILED: &str = "mobile_fallback_failed";
    pub const PAGE_UNREADABLE: &str = "page_unreadable";
    pub const STOPPED: &str = "stopped";
}

/// Discovery metadata attached to every strategy result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub strategy: StrategyKind,
    /// Run id shared by all strategies of one `discover()` call.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Triggers the probe attempted (adaptive/mega-menu paths).
    pub triggers_probed: u32,
    /// Triggers that yielded at least one item.
    pub triggers_yielding: u32,
    /// Item count before URL deduplication.
    pub raw_item_count: usize,
    /// unique URLs / URL-bearing items, in (0, 1]. 1.0 when nothing to dedup.
    pub unique_url_ratio: f64,
    /// Viewport the strategy actually ran against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportSize>,
    /// Interaction mode learned while probing, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_mode: Option<InteractionMode>,
    /// Failure reason code when the result is empty or degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResultMetadata {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            run_id: Uuid::nil(),
            started_at: Utc::now(),
            elapsed_ms: 0,
            triggers_probed: 0,
            triggers_yielding: 0,
            raw_item_count: 0,
            unique_url_ratio: 1.0,
            viewport: None,
            interaction_mode: None,
            reason: None,
        }
    }
}

/// The output of one strategy invocation (and of the whole engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    pub items: Vec<NavigationItem>,
    /// Normalized confidence in `[0, 1]`.
    pub confidence: f64,
    pub metadata: ResultMetadata,
    /// Selectors worth caching for this domain, present on successful runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<crate::hints::Hint>,
}

impl StrategyResult {
    /// An empty result carrying a failure reason. Confidence is zero.
    pub fn empty(strategy: StrategyKind, reason: &str) -> Self {
        let mut metadata = ResultMetadata::new(strategy);
        metadata.reason = Some(reason.to_string());
        Self {
            items: Vec::new(),
            confidence: 0.0,
            metadata,
            hint: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Normalize a URL for deduplication: resolve against `base`, lowercase the
/// host, drop the fragment, strip a trailing slash from the path.
///
/// Unparseable input falls back to the trimmed raw string so items with odd
/// hrefs still participate in dedup rather than being dropped.
pub fn normalize_url(raw: &str, base: &str) -> String {
    let trimmed = raw.trim();
    let resolved = match url::Url::parse(trimmed) {
        Ok(u) => Some(u),
        Err(_) => url::Url::parse(base).ok().and_then(|b| b.join(trimmed).ok()),
    };

    let Some(mut u) = resolved else {
        return trimmed.to_string();
    };

    u.set_fragment(None);
    if let Some(host) = u.host_str().map(|h| h.to_lowercase()) {
        let _ = u.set_host(Some(&host));
    }
    let mut s = u.to_string();
    // Keep the query (category ids live there) but drop a dangling slash.
    if u.query().is_none() && s.ends_with('/') && u.path() != "/" {
        s.pop();
    }
    s
}

/// Deduplicate items by normalized URL, preserving first-seen order.
///
/// Items without a URL are kept as-is. Returns the deduplicated list plus the
/// unique-URL ratio used for the duplicate confidence penalty.
pub fn dedup_by_url(items: Vec<NavigationItem>, base: &str) -> (Vec<NavigationItem>, f64) {
    let mut seen = std::collections::HashSet::new();
    let mut url_total = 0usize;
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        match &item.url {
            Some(u) => {
                url_total += 1;
                if seen.insert(normalize_url(u, base)) {
                    out.push(item);
                }
            }
            None => out.push(item),
        }
    }

    let ratio = if url_total == 0 {
        1.0
    } else {
        seen.len() as f64 / url_total as f64
    };
    (out, ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_basics() {
        assert_eq!(
            normalize_url("https://Shop.Example.com/Men/", "https://shop.example.com"),
            "https://shop.example.com/Men"
        );
        assert_eq!(
            normalize_url("/women#top", "https://shop.example.com"),
            "https://shop.example.com/women"
        );
        // Query survives normalization.
        assert_eq!(
            normalize_url("/c?categoryId=412", "https://shop.example.com"),
            "https://shop.example.com/c?categoryId=412"
        );
    }

    #[test]
    fn test_normalize_url_unparseable() {
        assert_eq!(normalize_url("  javascript:void(0) ", "not a base"), "javascript:void(0)");
    }

    #[test]
    fn test_dedup_by_url() {
        let via = StrategyKind::AdaptiveProbe;
        let items = vec![
            NavigationItem::top_level("Men", Some("/men".into()), "a", ItemKind::MainSection, via),
            NavigationItem::top_level("Men again", Some("/men/".into()), "b", ItemKind::MainSection, via),
            NavigationItem::top_level("Women", Some("/women".into()), "c", ItemKind::MainSection, via),
            NavigationItem::top_level("Toggle", None, "d", ItemKind::MainSection, via),
        ];
        let (deduped, ratio) = dedup_by_url(items, "https://x.com");
        assert_eq!(deduped.len(), 3); // one duplicate dropped, no-URL item kept
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_result_shape() {
        let r = StrategyResult::empty(StrategyKind::AdaptiveProbe, reason::NO_HEADER_CONTAINERS);
        assert!(r.is_empty());
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.metadata.reason.as_deref(), Some("no_header_containers"));
    }

    #[test]
    fn test_item_kind_wire_names() {
        let json = serde_json::to_string(&ItemKind::DropdownItem).unwrap();
        assert_eq!(json, "\"dropdown_item\"");
        let json = serde_json::to_string(&ItemKind::MobileNav).unwrap();
        assert_eq!(json, "\"mobile_nav\"");
    }
}
