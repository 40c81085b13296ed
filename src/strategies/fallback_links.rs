//! Non-interactive fallback link collection — the last desktop resort.
//!
//! Harvests whatever plausible navigation links exist in the static markup,
//! with only text-quality filtering. Low confidence ceiling by construction:
//! a flat link pile is better than nothing, but it earned no trust.

use super::{finalize, NavStrategy, RawOutcome, StrategyContext};
use crate::site::keywords::KeywordSet;
use crate::types::{normalize_url, reason, ItemKind, NavigationItem, StrategyKind, StrategyResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Instant;
use tracing::debug;

const MAX_FALLBACK_ITEMS: usize = 60;

const LINK_SCOPES: &[&str] = &[
    "header a",
    "nav a",
    "[role=\"navigation\"] a",
    ".menu a",
    ".navbar a",
    "ul.nav a",
];

/// Synchronous HTML pass (`scraper` types are not `Send`).
fn collect_links(
    html: &str,
    keywords: &KeywordSet,
    base_url: &str,
    via: StrategyKind,
) -> Vec<NavigationItem> {
    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();

    for scope in LINK_SCOPES {
        let Ok(selector) = Selector::parse(scope) else {
            continue;
        };
        for el in document.select(&selector) {
            if items.len() >= MAX_FALLBACK_ITEMS {
                return items;
            }
            let text = el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let len = text.chars().count();
            if !(2..=40).contains(&len) || !seen.insert(text.to_lowercase()) {
                continue;
            }
            if keywords.is_utility(&text) || keywords.is_skip(&text, el.value().attr("href")) {
                continue;
            }
            let url = el
                .value()
                .attr("href")
                .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                .map(|h| normalize_url(h, base_url));
            items.push(NavigationItem::top_level(
                text,
                url,
                (*scope).to_string(),
                ItemKind::MainSection,
                via,
            ));
        }
    }
    items
}

pub struct FallbackLinkStrategy;

#[async_trait]
impl NavStrategy for FallbackLinkStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FallbackLinks
    }

    async fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyResult> {
        let started = Instant::now();
        let kind = self.kind();

        let html = match cx.page.html().await {
            Ok(html) => html,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                debug!("page HTML unavailable: {e}");
                String::new()
            }
        };

        let items = collect_links(&html, cx.keywords, &cx.url, kind);
        let ceiling = cx.config.weights.fallback_links_ceiling;

        Ok(finalize(
            kind,
            RawOutcome {
                items,
                triggers_probed: 0,
                triggers_yielding: 0,
                empty_reason: reason::NO_LINKS_FOUND,
                hint: None,
                ceiling,
                tiered: false,
            },
            cx,
            started,
        )
        .await)
    }
}
