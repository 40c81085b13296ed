//! Adaptive header/trigger probing — the workhorse strategy for sites with
//! no pre-authored template.
//!
//! Pipeline: locate the header container (cached selector first), classify
//! its triggers, then probe each trigger sequentially through the
//! hover→click→poll protocol and extract whatever panel it reveals. The
//! interaction mode that works is fed back into the per-run inference so
//! later triggers skip straight to it.

use super::{finalize, NavStrategy, RawOutcome, StrategyContext};
use crate::discovery::extract::ContentExtractor;
use crate::discovery::header::HeaderLocator;
use crate::discovery::probe::InteractionProbe;
use crate::discovery::triggers::TriggerDiscoverer;
use crate::hints::{Hint, TogglerPattern};
use crate::types::{reason, ItemKind, NavigationItem, StrategyKind, StrategyResult};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

pub struct AdaptiveProbeStrategy;

#[async_trait]
impl NavStrategy for AdaptiveProbeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdaptiveProbe
    }

    async fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyResult> {
        let started = Instant::now();
        let kind = self.kind();
        let page = cx.page;
        let clock = cx.clock;
        let keywords = cx.keywords;
        let config = cx.config;
        let quirk = cx.quirk.clone();
        let base_url = cx.url.clone();

        let cached_header = cx.hint.as_ref().and_then(|h| h.header_selector.clone());
        let cached_patterns = cx
            .hint
            .as_ref()
            .map(|h| h.toggler_patterns.clone())
            .unwrap_or_default();

        let locator = HeaderLocator::new(keywords, config);
        let headers = locator.locate(page, cached_header.as_deref()).await?;
        let Some(header) = headers.into_iter().next() else {
            return Ok(finalize(
                kind,
                RawOutcome {
                    items: Vec::new(),
                    triggers_probed: 0,
                    triggers_yielding: 0,
                    empty_reason: reason::NO_HEADER_CONTAINERS,
                    hint: None,
                    ceiling: 1.0,
                    tiered: false,
                },
                cx,
                started,
            )
            .await);
        };

        let discoverer = TriggerDiscoverer::new(keywords, config);
        let togglers = discoverer.discover(page, &header, &cached_patterns).await?;
        if togglers.is_empty() {
            return Ok(finalize(
                kind,
                RawOutcome {
                    items: Vec::new(),
                    triggers_probed: 0,
                    triggers_yielding: 0,
                    empty_reason: reason::NO_TOGGLERS_FOUND,
                    hint: None,
                    ceiling: 1.0,
                    tiered: false,
                },
                cx,
                started,
            )
            .await);
        }

        let panel_selectors = keywords.mega_menu_containers.clone();
        let probe = InteractionProbe::new(page, clock, config, &quirk, &panel_selectors);
        let extractor = ContentExtractor::new(keywords, config);

        let mut items: Vec<NavigationItem> = Vec::new();
        let mut learned: Vec<TogglerPattern> = Vec::new();
        let mut probed = 0u32;
        let mut yielding = 0u32;

        for toggler in &togglers {
            if cx.stop.is_stopped() {
                debug!("stop requested, returning what was found");
                break;
            }
            probed += 1;

            let preferred = toggler
                .preferred_interaction
                .or_else(|| cx.run.modes.preferred());
            let outcome = probe.probe(toggler, preferred, true).await?;

            let mut child_count = 0usize;
            if let Some(panel) = &outcome.panel {
                if let Some(mode) = outcome.opened_by {
                    cx.run.modes.record(mode);
                }
                let children = extractor
                    .extract_panel(page, &toggler.text, panel, &base_url, kind)
                    .await?;
                child_count = children.len();
                items.extend(children);
            }

            let url = toggler
                .href
                .as_deref()
                .filter(|h| !h.is_empty() && !h.starts_with("javascript:") && *h != "#")
                .map(|h| crate::types::normalize_url(h, &base_url));
            items.push(NavigationItem::top_level(
                toggler.text.clone(),
                url,
                toggler.selector.clone(),
                ItemKind::MainSection,
                kind,
            ));

            if child_count > 0 {
                yielding += 1;
                learned.push(TogglerPattern {
                    text: toggler.text.clone(),
                    selector: toggler.selector.clone(),
                    interaction: outcome.opened_by,
                });
            }

            probe.dismiss().await?;
        }

        let hint = Hint {
            header_selector: Some(header.selector.clone()),
            toggler_patterns: learned,
            panel_strategy: Some("adaptive".to_string()),
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
