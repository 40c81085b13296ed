//! Pattern-matched extraction for sites with a registered template.
//!
//! No discovery phase: the template's selectors are applied directly, with
//! its own hover choreography, and the flat dropdown harvest is reattached to
//! main-nav items by label. Runs only when a template actually registered for
//! the domain (explicitly or via platform fingerprint) — the universal
//! template belongs to the generic mega-menu capture, not here.

use super::{finalize, NavStrategy, RawOutcome, StrategyContext};
use crate::discovery::extract::category_id_from_url;
use crate::dom;
use crate::hints::{Hint, TogglerPattern};
use crate::site::patterns::TemplateSource;
use crate::types::{
    normalize_url, reason, InteractionMode, ItemKind, NavigationItem, StrategyKind, StrategyResult,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::debug;

const MAX_MAIN_ITEMS: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavItemsResponse {
    items: Vec<RawNavItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNavItem {
    text: String,
    #[serde(default)]
    href: Option<String>,
    locator: String,
}

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

/// A dropdown link harvested under some label, before reattachment.
#[derive(Debug, Clone)]
pub(crate) struct HarvestedLink {
    pub label: String,
    pub name: String,
    pub url: Option<String>,
    pub selector: String,
    pub column: Option<u32>,
    pub group_title: Option<String>,
    pub category_id: Option<u64>,
}

/// Reattach harvested dropdown links to the main-nav item whose label
/// matches (case-insensitive). Labels with no matching parent become orphan
/// top-level sections of kind `DropdownCategory`, and their links hang off
/// the orphan.
pub(crate) fn reattach(
    main_items: &[NavigationItem],
    harvested: Vec<HarvestedLink>,
    via: StrategyKind,
) -> Vec<NavigationItem> {
    let mut out = Vec::with_capacity(harvested.len());
    let mut orphan_labels: Vec<String> = Vec::new();

    for link in harvested {
        let parent = main_items
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(&link.label))
            .map(|m| m.name.clone());

        let parent = match parent {
            Some(p) => p,
            None => {
                if !orphan_labels
                    .iter()
                    .any(|l| l.eq_ignore_ascii_case(&link.label))
                {
                    orphan_labels.push(link.label.clone());
                    out.push(NavigationItem::top_level(
                        link.label.clone(),
                        None,
                        "",
                        ItemKind::DropdownCategory,
                        via,
                    ));
                }
                link.label.clone()
            }
        };

        out.push(NavigationItem {
            name: link.name,
            url: link.url,
            selector: link.selector,
            kind: ItemKind::DropdownItem,
            parent: Some(parent),
            hierarchy_level: 2,
            discovered_via: via,
            column: link.column,
            group_title: link.group_title,
            category_id: link.category_id,
        });
    }
    out
}

pub struct PatternMatchStrategy;

#[async_trait]
impl NavStrategy for PatternMatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PatternMatch
    }

    async fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyResult> {
        let started = Instant::now();
        let kind = self.kind();
        let page = cx.page;
        let clock = cx.clock;
        let config = cx.config;
        let base_url = cx.url.clone();

        let html = match page.html().await {
            Ok(html) => html,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                debug!("page HTML unavailable: {e}");
                String::new()
            }
        };

        let (template, source) = cx.patterns.match_template(&cx.domain, &html);
        let template = template.clone();
        match &source {
            TemplateSource::Universal => {
                return Ok(finalize(
                    kind,
                    RawOutcome {
                        items: Vec::new(),
                        triggers_probed: 0,
                        triggers_yielding: 0,
                        empty_reason: reason::NO_REGISTERED_TEMPLATE,
                        hint: None,
                        ceiling: 1.0,
                        tiered: true,
                    },
                    cx,
                    started,
                )
                .await);
            }
            TemplateSource::Platform(name) => {
                debug!(template = %template.name, platform = %name, "platform template matched");
            }
            TemplateSource::Registered => {
                debug!(template = %template.name, "registered template matched");
            }
        }

        let params = json!({
            "selectors": template.main_nav,
            "maxItems": MAX_MAIN_ITEMS,
            "maxTop": config.header_top_cutoff_px * 2.0,
            "markAttr": dom::MARK_ATTR,
        });
        let raw_items = dom::eval_call::<NavItemsResponse>(
            page,
            dom::NAV_ITEMS_JS,
            &params,
            config.eval_timeout_ms,
        )
        .await?
        .map(|r| r.items)
        .unwrap_or_default();

        if raw_items.is_empty() {
            return Ok(finalize(
                kind,
                RawOutcome {
                    items: Vec::new(),
                    triggers_probed: 0,
                    triggers_yielding: 0,
                    empty_reason: reason::TEMPLATE_YIELDED_NOTHING,
                    hint: None,
                    ceiling: 1.0,
                    tiered: true,
                },
                cx,
                started,
            )
            .await);
        }

        let main_items: Vec<NavigationItem> = raw_items
            .iter()
            .map(|raw| {
                let url = raw
                    .href
                    .as_deref()
                    .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                    .map(|h| normalize_url(h, &base_url));
                NavigationItem::top_level(
                    raw.text.clone(),
                    url,
                    raw.locator.clone(),
                    ItemKind::MainSection,
                    kind,
                )
            })
            .collect();

        // Hover each main item per the template's choreography and harvest
        // every dropdown container the template names.
        let mut harvested: Vec<HarvestedLink> = Vec::new();
        let mut probed = 0u32;
        let mut yielding = 0u32;
        let mut learned: Vec<TogglerPattern> = Vec::new();

        for raw in &raw_items {
            if cx.stop.is_stopped() {
                break;
            }
            probed += 1;

            if let Err(e) = page.hover(&raw.locator).await {
                if e.is_fatal() {
                    return Err(e.into());
                }
                debug!(item = %raw.text, "hover failed: {e}");
                continue;
            }
            clock
                .sleep(Duration::from_millis(template.hover_delay_ms))
                .await;

            let before = harvested.len();
            for container in &template.dropdown_containers {
                let params = json!({
                    "containerSelector": container,
                    "matchIndex": 0,
                    "maxLinks": config.max_links_per_panel,
                });
                let Some(response) = dom::eval_call::<ExtractResponse>(
                    page,
                    dom::PANEL_EXTRACT_JS,
                    &params,
                    config.eval_timeout_ms,
                )
                .await?
                else {
                    continue;
                };
                let multi_column = response.column_count > 1;
                for link in response.links {
                    let text = link.text.trim();
                    if text.is_empty() || cx.keywords.is_skip(text, link.href.as_deref()) {
                        continue;
                    }
                    let url = link
                        .href
                        .as_deref()
                        .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                        .map(|h| normalize_url(h, &base_url));
                    harvested.push(HarvestedLink {
                        label: raw.text.clone(),
                        name: text.to_string(),
                        url: url.clone(),
                        selector: format!("{container} a"),
                        column: multi_column.then_some(link.column),
                        group_title: link.group_title,
                        category_id: url.as_deref().and_then(category_id_from_url),
                    });
                }
                if harvested.len() > before {
                    break; // first matching container wins for this item
                }
            }

            if harvested.len() > before {
                yielding += 1;
                learned.push(TogglerPattern {
                    text: raw.text.clone(),
                    selector: raw.locator.clone(),
                    interaction: Some(InteractionMode::Hover),
                });
            }

            let _ = page.move_mouse(4.0, 4.0).await;
            clock
                .sleep(Duration::from_millis(template.dismiss_delay_ms))
                .await;
        }

        let mut items = main_items.clone();
        items.extend(reattach(&main_items, harvested, kind));

        let hint = Hint {
            header_selector: None,
            toggler_patterns: learned,
            panel_strategy: Some(template.name.clone()),
        };

        Ok(finalize(
            kind,
            RawOutcome {
                items,
                triggers_probed: probed,
                triggers_yielding: yielding,
                empty_reason: reason::TEMPLATE_YIELDED_NOTHING,
                hint: Some(hint),
                ceiling: 1.0,
                tiered: true,
            },
            cx,
            started,
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main(name: &str) -> NavigationItem {
        NavigationItem::top_level(
            name,
            Some(format!("/{}", name.to_lowercase())),
            "a",
            ItemKind::MainSection,
            StrategyKind::PatternMatch,
        )
    }

    fn harvested(label: &str, name: &str) -> HarvestedLink {
        HarvestedLink {
            label: label.into(),
            name: name.into(),
            url: Some(format!("/{}", name.to_lowercase())),
            selector: ".panel a".into(),
            column: None,
            group_title: None,
            category_id: None,
        }
    }

    #[test]
    fn test_reattach_by_label() {
        let mains = vec![main("Women"), main("Men")];
        let out = reattach(
            &mains,
            vec![harvested("women", "Dresses"), harvested("Men", "Shirts")],
            StrategyKind::PatternMatch,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].parent.as_deref(), Some("Women")); // case-insensitive
        assert_eq!(out[1].parent.as_deref(), Some("Men"));
    }

    #[test]
    fn test_reattach_orphans_get_top_level_section() {
        let mains = vec![main("Women")];
        let out = reattach(
            &mains,
            vec![
                harvested("Trending", "Sneakers"),
                harvested("Trending", "Puffers"),
            ],
            StrategyKind::PatternMatch,
        );
        // One orphan section plus its two children.
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].name, "Trending");
        assert_eq!(out[0].kind, ItemKind::DropdownCategory);
        assert_eq!(out[0].hierarchy_level, 1);
        assert!(out[1..]
            .iter()
            .all(|i| i.parent.as_deref() == Some("Trending") && i.hierarchy_level == 2));
    }
}
