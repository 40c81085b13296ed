//! Mobile-drawer fallback — the last strategy in the chain.
//!
//! Runs against the original page (not the desktop context): sets a mobile
//! viewport, tries direct extraction from known mobile-nav containers, and if
//! that comes up short, finds and activates a hamburger control before
//! extracting its revealed content. The original viewport is restored on the
//! way out.

use super::{finalize, NavStrategy, RawOutcome, StrategyContext};
use crate::dom;
use crate::types::{normalize_url, reason, ItemKind, NavigationItem, StrategyKind, StrategyResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::debug;

const MAX_MOBILE_LINKS: usize = 80;
/// Settle time after activating the hamburger, before re-reading containers.
const DRAWER_SETTLE_MS: u64 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MobileNavResponse {
    #[serde(default)]
    container_selector: Option<String>,
    links: Vec<MobileLink>,
}

#[derive(Debug, Deserialize)]
struct MobileLink {
    text: String,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HamburgerResponse {
    found: bool,
    #[serde(default)]
    selector: Option<String>,
}

pub struct MobileFallbackStrategy;

impl MobileFallbackStrategy {
    async fn read_containers(
        &self,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<MobileNavResponse>> {
        let params = json!({
            "containerSelectors": cx.keywords.mobile_containers,
            "maxLinks": MAX_MOBILE_LINKS,
        });
        dom::eval_call::<MobileNavResponse>(
            cx.page,
            dom::MOBILE_NAV_JS,
            &params,
            cx.config.eval_timeout_ms,
        )
        .await
    }

    fn to_items(
        &self,
        response: &MobileNavResponse,
        cx: &StrategyContext<'_>,
    ) -> Vec<NavigationItem> {
        let container = response
            .container_selector
            .clone()
            .unwrap_or_else(|| "mobile-nav".to_string());
        response
            .links
            .iter()
            .filter(|link| {
                let text = link.text.trim();
                !text.is_empty()
                    && !cx.keywords.is_utility(text)
                    && !cx.keywords.is_skip(text, link.href.as_deref())
            })
            .map(|link| {
                let url = link
                    .href
                    .as_deref()
                    .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                    .map(|h| normalize_url(h, &cx.url));
                NavigationItem::top_level(
                    link.text.trim(),
                    url,
                    format!("{container} a"),
                    ItemKind::MobileNav,
                    StrategyKind::MobileFallback,
                )
            })
            .collect()
    }
}

#[async_trait]
impl NavStrategy for MobileFallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MobileFallback
    }

    fn wants_desktop(&self) -> bool {
        false
    }

    async fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyResult> {
        let started = Instant::now();
        let kind = self.kind();

        let original_viewport = cx.page.viewport().await.ok();

        if let Err(e) = cx.page.set_viewport(cx.config.mobile_viewport).await {
            if e.is_fatal() {
                return Err(e.into());
            }
            debug!("mobile viewport rejected: {e}");
            return Ok(finalize(
                kind,
                RawOutcome {
                    items: Vec::new(),
                    triggers_probed: 0,
                    triggers_yielding: 0,
                    empty_reason: reason::MOBILE_FALLBACK_FAILED,
                    hint: None,
                    ceiling: cx.config.weights.mobile_ceiling,
                    tiered: false,
                },
                cx,
                started,
            )
            .await);
        }

        // Direct extraction from already-visible mobile containers.
        let mut items = match self.read_containers(cx).await? {
            Some(response) => self.to_items(&response, cx),
            None => Vec::new(),
        };

        // Too few? Find the hamburger, open the drawer, read again.
        if items.len() < cx.config.min_items && !cx.stop.is_stopped() {
            let params = json!({
                "selectors": cx.keywords.hamburger_selectors,
                "maxTop": cx.config.header_top_cutoff_px,
            });
            let hamburger = dom::eval_call::<HamburgerResponse>(
                cx.page,
                dom::HAMBURGER_SCAN_JS,
                &params,
                cx.config.eval_timeout_ms,
            )
            .await?;

            if let Some(selector) = hamburger.filter(|h| h.found).and_then(|h| h.selector) {
                match cx.page.click(&selector).await {
                    Ok(()) => {
                        cx.clock.sleep(Duration::from_millis(DRAWER_SETTLE_MS)).await;
                        if let Some(response) = self.read_containers(cx).await? {
                            let drawer_items = self.to_items(&response, cx);
                            if drawer_items.len() > items.len() {
                                items = drawer_items;
                            }
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => debug!(selector = %selector, "hamburger click failed: {e}"),
                }
            }
        }

        // Leave the page as we found it, best-effort.
        if let Some(viewport) = original_viewport {
            let _ = cx.page.set_viewport(viewport).await;
        }

        let ceiling = cx.config.weights.mobile_ceiling;
        let mut result = finalize(
            kind,
            RawOutcome {
                items,
                triggers_probed: 0,
                triggers_yielding: 0,
                empty_reason: reason::MOBILE_FALLBACK_FAILED,
                hint: None,
                ceiling,
                tiered: false,
            },
            cx,
            started,
        )
        .await;
        // The strategy ran at the mobile viewport even though it restored
        // the original before returning.
        result.metadata.viewport = Some(cx.config.mobile_viewport);
        Ok(result)
    }
}
