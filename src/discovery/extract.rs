//! Content extraction: turn a confirmed-open panel into navigation items.

use super::probe::PanelRef;
use crate::config::EngineConfig;
use crate::dom;
use crate::driver::PageHandle;
use crate::site::keywords::KeywordSet;
use crate::types::{normalize_url, ItemKind, NavigationItem, StrategyKind};
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    column_count: u32,
    links: Vec<PanelLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelLink {
    text: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    column: u32,
    #[serde(default)]
    group_title: Option<String>,
}

/// Derive a numeric category id from a URL's query string, when the site
/// encodes one (`?categoryId=412`, `?cid=81023`, ...).
pub fn category_id_from_url(url: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)[?&](?:categoryid|categorycode|catid|cat|cid|node|dept)=(\d{2,12})\b")
            .expect("category id regex is valid")
    });
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses revealed panels into structured navigation items.
pub struct ContentExtractor<'a> {
    keywords: &'a KeywordSet,
    config: &'a EngineConfig,
}

impl<'a> ContentExtractor<'a> {
    pub fn new(keywords: &'a KeywordSet, config: &'a EngineConfig) -> Self {
        Self { keywords, config }
    }

    /// Extract every qualifying link in `panel` as a child of `trigger_name`.
    ///
    /// Links matching the skip patterns (social, legal, privacy) are dropped.
    /// When the panel has column structure, each item carries its column
    /// index and nearest group heading; query-string category ids are
    /// attached when present.
    pub async fn extract_panel(
        &self,
        page: &dyn PageHandle,
        trigger_name: &str,
        panel: &PanelRef,
        base_url: &str,
        via: StrategyKind,
    ) -> Result<Vec<NavigationItem>> {
        let params = json!({
            "containerSelector": panel.selector,
            "matchIndex": panel.match_index,
            "maxLinks": self.config.max_links_per_panel,
        });

        let Some(response) = dom::eval_call::<ExtractResponse>(
            page,
            dom::PANEL_EXTRACT_JS,
            &params,
            self.config.eval_timeout_ms,
        )
        .await?
        else {
            return Ok(Vec::new());
        };

        let multi_column = response.column_count > 1;
        let mut items = Vec::with_capacity(response.links.len());

        for link in response.links {
            let text = link.text.trim();
            if text.is_empty() {
                continue;
            }
            if self.keywords.is_skip(text, link.href.as_deref()) {
                continue;
            }

            let url = link
                .href
                .as_deref()
                .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                .map(|h| normalize_url(h, base_url));
            let category_id = url.as_deref().and_then(category_id_from_url);

            items.push(NavigationItem {
                name: text.to_string(),
                url,
                selector: format!("{} a", panel.selector),
                kind: ItemKind::DropdownItem,
                parent: Some(trigger_name.to_string()),
                hierarchy_level: 2,
                discovered_via: via,
                column: multi_column.then_some(link.column),
                group_title: link.group_title,
                category_id,
            });
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::markers;
    use crate::driver::scripted::ScriptedPage;

    fn panel() -> PanelRef {
        PanelRef {
            selector: ".mega-menu".into(),
            match_index: 0,
            key: "k".into(),
            area: 50_000.0,
            link_count: 10,
        }
    }

    fn link(text: &str, href: &str, column: u32, group: Option<&str>) -> serde_json::Value {
        json!({"text": text, "href": href, "column": column, "groupTitle": group})
    }

    #[tokio::test]
    async fn test_extracts_children_with_columns() {
        let page = ScriptedPage::new("https://shop.example.com").respond(
            markers::PANEL_EXTRACT,
            json!({
                "columnCount": 3,
                "links": [
                    link("Dresses", "/women/dresses", 0, Some("Clothing")),
                    link("Boots", "/women/boots?cid=4410", 1, Some("Shoes")),
                    link("Follow us", "https://instagram.com/shop", 2, None),
                ]
            }),
        );

        let config = EngineConfig::default();
        let extractor = ContentExtractor::new(KeywordSet::builtin(), &config);
        let items = extractor
            .extract_panel(&page, "Women", &panel(), "https://shop.example.com", StrategyKind::MegaMenuCapture)
            .await
            .unwrap();

        assert_eq!(items.len(), 2); // instagram link skipped

        let dresses = &items[0];
        assert_eq!(dresses.parent.as_deref(), Some("Women"));
        assert_eq!(dresses.hierarchy_level, 2);
        assert_eq!(dresses.kind, ItemKind::DropdownItem);
        assert_eq!(dresses.column, Some(0));
        assert_eq!(dresses.group_title.as_deref(), Some("Clothing"));
        assert_eq!(dresses.url.as_deref(), Some("https://shop.example.com/women/dresses"));

        let boots = &items[1];
        assert_eq!(boots.category_id, Some(4410));
    }

    #[tokio::test]
    async fn test_single_column_has_no_column_metadata() {
        let page = ScriptedPage::new("https://shop.example.com").respond(
            markers::PANEL_EXTRACT,
            json!({
                "columnCount": 1,
                "links": [link("Sofas", "/home/sofas", 0, None)]
            }),
        );

        let config = EngineConfig::default();
        let extractor = ContentExtractor::new(KeywordSet::builtin(), &config);
        let items = extractor
            .extract_panel(&page, "Home", &panel(), "https://shop.example.com", StrategyKind::AdaptiveProbe)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].column, None);
    }

    #[tokio::test]
    async fn test_degenerate_hrefs_become_linkless_items() {
        let page = ScriptedPage::new("https://shop.example.com").respond(
            markers::PANEL_EXTRACT,
            json!({
                "columnCount": 1,
                "links": [
                    link("All Brands", "#", 0, None),
                    link("Open menu", "javascript:void(0)", 0, None),
                ]
            }),
        );

        let config = EngineConfig::default();
        let extractor = ContentExtractor::new(KeywordSet::builtin(), &config);
        let items = extractor
            .extract_panel(&page, "Brands", &panel(), "https://shop.example.com", StrategyKind::AdaptiveProbe)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.url.is_none()));
    }

    #[test]
    fn test_category_id_patterns() {
        assert_eq!(
            category_id_from_url("https://x.com/c?categoryId=412"),
            Some(412)
        );
        assert_eq!(category_id_from_url("https://x.com/list?cid=81023&page=2"), Some(81023));
        assert_eq!(category_id_from_url("https://x.com/b?node=16225007011"), Some(16225007011));
        assert_eq!(category_id_from_url("https://x.com/women/dresses"), None);
        // Single digit is too weak a signal.
        assert_eq!(category_id_from_url("https://x.com/c?cat=7"), None);
    }
}
