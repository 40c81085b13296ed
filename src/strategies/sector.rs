//! Sector-template link collection.
//!
//! Non-interactive: infers the site's sector (fashion, electronics, ...)
//! from page text, then harvests static nav links whose labels fit that
//! sector's vocabulary. Parses the page HTML engine-side with `scraper` —
//! no extra DOM round-trips.

use super::{finalize, NavStrategy, RawOutcome, StrategyContext};
use crate::site::keywords::KeywordSet;
use crate::site::patterns::{detect_sector, SectorTemplate};
use crate::types::{normalize_url, reason, ItemKind, NavigationItem, StrategyKind, StrategyResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Instant;
use tracing::debug;

const MAX_SECTOR_ITEMS: usize = 40;

/// Containers worth harvesting static links from.
const LINK_SCOPES: &[&str] = &[
    "header a",
    "nav a",
    "[role=\"navigation\"] a",
    ".menu a",
    ".navbar a",
];

/// Synchronous HTML pass. `scraper`'s types are not `Send`, so the parse
/// must not straddle an await point.
fn collect_sector_links(
    html: &str,
    sectors: &[SectorTemplate],
    keywords: &KeywordSet,
    base_url: &str,
    via: StrategyKind,
) -> Option<(String, Vec<NavigationItem>)> {
    let document = Html::parse_document(html);

    let page_text: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let sector = detect_sector(sectors, &page_text)?;

    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();

    for scope in LINK_SCOPES {
        let Ok(selector) = Selector::parse(scope) else {
            continue;
        };
        for el in document.select(&selector) {
            if items.len() >= MAX_SECTOR_ITEMS {
                break;
            }
            let text = el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() || !seen.insert(text.to_lowercase()) {
                continue;
            }
            let lower = text.to_lowercase();
            let sector_fit = sector
                .keywords
                .iter()
                .any(|kw| lower.contains(kw.as_str()) || kw.contains(lower.as_str()));
            if !sector_fit || keywords.is_utility(&text) || keywords.is_skip(&text, None) {
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

    Some((sector.name.clone(), items))
}

pub struct SectorTemplateStrategy;

#[async_trait]
impl NavStrategy for SectorTemplateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SectorTemplate
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

        let collected = collect_sector_links(&html, cx.sectors, cx.keywords, &cx.url, kind);

        let (empty_reason, items) = match collected {
            Some((sector, items)) => {
                debug!(sector = %sector, count = items.len(), "sector links collected");
                (reason::NO_LINKS_FOUND, items)
            }
            None => (reason::NO_SECTOR_MATCH, Vec::new()),
        };

        let ceiling = cx.config.weights.sector_ceiling;
        Ok(finalize(
            kind,
            RawOutcome {
                items,
                triggers_probed: 0,
                triggers_yielding: 0,
                empty_reason,
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
