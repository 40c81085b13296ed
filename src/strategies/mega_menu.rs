//! Generic mega-menu hover capture.
//!
//! Assumes the classic storefront shape: a horizontal bar of top-level links
//! near the top of the page, each revealing a wide multi-column panel on
//! hover. No click fallback here — click-toggled navs are the adaptive
//! strategy's job. Column/group structure is preserved on extracted items.

use super::{finalize, NavStrategy, RawOutcome, StrategyContext};
use crate::discovery::extract::ContentExtractor;
use crate::discovery::probe::InteractionProbe;
use crate::discovery::triggers::Toggler;
use crate::discovery::CandidateSource;
use crate::dom;
use crate::hints::{Hint, TogglerPattern};
use crate::site::quirks::SiteQuirk;
use crate::types::{reason, InteractionMode, ItemKind, NavigationItem, StrategyKind, StrategyResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;

/// Fewest top-bar items that still look like a main nav.
const MIN_NAV_BAR_ITEMS: usize = 3;
/// Cap on hovered items; mega-menus rarely have more top-level sections.
const MAX_NAV_BAR_ITEMS: usize = 10;

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

pub struct MegaMenuStrategy;

#[async_trait]
impl NavStrategy for MegaMenuStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MegaMenuCapture
    }

    async fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyResult> {
        let started = Instant::now();
        let kind = self.kind();
        let page = cx.page;
        let clock = cx.clock;
        let keywords = cx.keywords;
        let config = cx.config;
        let base_url = cx.url.clone();
        let template = cx.patterns.universal().clone();

        let params = json!({
            "selectors": template.main_nav,
            "maxItems": MAX_NAV_BAR_ITEMS,
            "maxTop": config.header_top_cutoff_px,
            "markAttr": dom::MARK_ATTR,
        });
        let nav_items = dom::eval_call::<NavItemsResponse>(
            page,
            dom::NAV_ITEMS_JS,
            &params,
            config.eval_timeout_ms,
        )
        .await?
        .map(|r| r.items)
        .unwrap_or_default();

        if nav_items.len() < MIN_NAV_BAR_ITEMS {
            return Ok(finalize(
                kind,
                RawOutcome {
                    items: Vec::new(),
                    triggers_probed: 0,
                    triggers_yielding: 0,
                    empty_reason: reason::NO_NAV_BAR,
                    hint: None,
                    ceiling: 1.0,
                    tiered: false,
                },
                cx,
                started,
            )
            .await);
        }

        // Fold the template's hover delay into the quirk so the probe's
        // settle wait honors both.
        let quirk = SiteQuirk {
            hover_settle_ms: cx.quirk.hover_settle_ms.max(template.hover_delay_ms),
            mouse_off_delay_ms: cx.quirk.mouse_off_delay_ms.max(template.dismiss_delay_ms),
            ..cx.quirk.clone()
        };

        let mut panel_selectors = template.dropdown_containers.clone();
        for extra in &keywords.mega_menu_containers {
            if !panel_selectors.contains(extra) {
                panel_selectors.push(extra.clone());
            }
        }

        let probe = InteractionProbe::new(page, clock, config, &quirk, &panel_selectors);
        let extractor = ContentExtractor::new(keywords, config);

        let mut items: Vec<NavigationItem> = Vec::new();
        let mut learned: Vec<TogglerPattern> = Vec::new();
        let mut probed = 0u32;
        let mut yielding = 0u32;

        for nav_item in &nav_items {
            if cx.stop.is_stopped() {
                break;
            }
            if keywords.is_utility(&nav_item.text) {
                continue;
            }
            probed += 1;

            let toggler = Toggler {
                text: nav_item.text.clone(),
                relative_selector: nav_item.locator.clone(),
                selector: nav_item.locator.clone(),
                source: CandidateSource::Discovery,
                href: nav_item.href.clone(),
                preferred_interaction: Some(InteractionMode::Hover),
            };

            let outcome = probe.probe(&toggler, Some(InteractionMode::Hover), false).await?;

            let mut child_count = 0usize;
            if let Some(panel) = &outcome.panel {
                cx.run.modes.record(InteractionMode::Hover);
                let children = extractor
                    .extract_panel(page, &nav_item.text, panel, &base_url, kind)
                    .await?;
                child_count = children.len();
                items.extend(children);
            }

            let url = nav_item
                .href
                .as_deref()
                .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                .map(|h| crate::types::normalize_url(h, &base_url));
            items.push(NavigationItem::top_level(
                nav_item.text.clone(),
                url,
                nav_item.locator.clone(),
                ItemKind::MainSection,
                kind,
            ));

            if child_count > 0 {
                yielding += 1;
                learned.push(TogglerPattern {
                    text: nav_item.text.clone(),
                    selector: nav_item.locator.clone(),
                    interaction: Some(InteractionMode::Hover),
                });
            }

            probe.dismiss().await?;
        }

        let hint = Hint {
            header_selector: None,
            toggler_patterns: learned,
            panel_strategy: Some("mega_menu".to_string()),
        };

        Ok(finalize(
            kind,
            RawOutcome {
                items,
                triggers_probed: probed,
                triggers_yielding: yielding,
                empty_reason: reason::NO_PANELS_REVEALED,
                hint: Some(hint),
                ceiling: 1.0,
                tiered: false,
            },
            cx,
            started,
        )
        .await)
    }
}
