// Copyright 2026 Navscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! The strategy orchestrator.
//!
//! Walks the fixed-priority strategy chain over one already-navigated page,
//! stops early once a result clears the sufficient threshold, and otherwise
//! returns the single highest-confidence result observed. Results are never
//! merged across strategies — heterogeneous hierarchy levels don't mix.
//!
//! Side effects, in order: hint load before discovery, optional anti-bot
//! warm-up, desktop context management (closed on every exit path), and hint
//! persistence after a sufficient result.

use crate::clock::{Clock, TokioClock};
use crate::config::EngineConfig;
use crate::driver::{BrowserHandle, PageHandle};
use crate::hints::{hint_ttl_secs, HintCache};
use crate::site::keywords::KeywordSet;
use crate::site::patterns::{builtin_sectors, PatternLibrary, SectorTemplate};
use crate::site::quirks::SiteQuirkTable;
use crate::stealth::AntiBotSimulator;
use crate::strategies::{default_chain, NavStrategy, RunState, StopFlag, StrategyContext};
use crate::types::{reason, StrategyKind, StrategyResult};
use crate::viewport::ViewportContextManager;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Adaptive navigation discovery over a single browser page.
pub struct DiscoveryEngine {
    config: EngineConfig,
    keywords: KeywordSet,
    quirks: SiteQuirkTable,
    patterns: PatternLibrary,
    sectors: Vec<SectorTemplate>,
    hints: Option<HintCache>,
    clock: Arc<dyn Clock>,
    anti_bot: AntiBotSimulator,
    strategies: Vec<Box<dyn NavStrategy>>,
}

impl DiscoveryEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            keywords: KeywordSet::builtin().clone(),
            quirks: SiteQuirkTable::builtin(),
            patterns: PatternLibrary::builtin(),
            sectors: builtin_sectors(),
            hints: None,
            clock: Arc::new(TokioClock),
            anti_bot: AntiBotSimulator::new(),
            strategies: default_chain(),
        }
    }

    /// Attach a hint cache. Without one, every run rediscovers from scratch.
    pub fn with_hint_cache(mut self, cache: HintCache) -> Self {
        self.hints = Some(cache);
        self
    }

    pub fn with_quirks(mut self, quirks: SiteQuirkTable) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_patterns(mut self, patterns: PatternLibrary) -> Self {
        self.patterns = patterns;
        self
    }

    /// Swap the clock (fake clock in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Discover navigation on `page`. See [`Self::discover_with`].
    pub async fn discover(
        &self,
        browser: &dyn BrowserHandle,
        page: &dyn PageHandle,
    ) -> Result<StrategyResult> {
        self.discover_with(browser, page, StopFlag::new()).await
    }

    /// Discover navigation on `page`, honoring a cooperative stop flag.
    ///
    /// Always returns a well-formed [`StrategyResult`] for reachable page
    /// states — a page with no navigation markup at all yields confidence 0,
    /// empty items, and a reason code. The only errors are unrecoverable
    /// driver failures (lost context), which the caller handles by recreating
    /// the browsing context.
    pub async fn discover_with(
        &self,
        browser: &dyn BrowserHandle,
        page: &dyn PageHandle,
        stop: StopFlag,
    ) -> Result<StrategyResult> {
        let url = match page.url().await {
            Ok(url) => url,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                debug!("page URL unreadable: {e}");
                String::new()
            }
        };
        let domain = domain_of(&url);
        let run_id = Uuid::new_v4();
        info!(%domain, %run_id, "navigation discovery starting");

        let quirk = self.quirks.lookup(&domain);
        let hint = match &self.hints {
            Some(cache) => cache.load(&domain).await,
            None => None,
        };
        if hint.is_some() {
            debug!(%domain, "cached hint loaded");
        }

        self.anti_bot
            .simulate(page, &domain, &quirk, self.clock.as_ref())
            .await;

        // Scoped resource: closed on every exit below, including the fatal
        // path — no `?` between here and the close.
        let lease = ViewportContextManager::new(&self.config)
            .ensure_desktop(browser, page, &url)
            .await?;

        let mut run = RunState::default();
        let mut best: Option<StrategyResult> = None;
        let mut adaptive_diagnosis: Option<StrategyResult> = None;
        let mut sufficient = false;
        let mut fatal: Option<anyhow::Error> = None;

        for strategy in &self.strategies {
            if stop.is_stopped() {
                debug!("stop requested between strategies");
                break;
            }

            let active: &dyn PageHandle = match (&lease, strategy.wants_desktop()) {
                (Some(lease), true) => lease.page(),
                _ => page,
            };

            let mut cx = StrategyContext {
                page: active,
                url: url.clone(),
                domain: domain.clone(),
                quirk: quirk.clone(),
                hint: hint.clone(),
                keywords: &self.keywords,
                patterns: &self.patterns,
                sectors: &self.sectors,
                config: &self.config,
                clock: self.clock.as_ref(),
                stop: stop.clone(),
                run: &mut run,
                run_id,
            };

            let result = match strategy.run(&mut cx).await {
                Ok(result) => result,
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            };

            info!(
                strategy = strategy.kind().as_str(),
                items = result.items.len(),
                confidence = result.confidence,
                reason = result.metadata.reason.as_deref().unwrap_or("-"),
                "strategy finished"
            );

            if strategy.kind() == StrategyKind::AdaptiveProbe && result.is_empty() {
                adaptive_diagnosis = Some(result.clone());
            }

            let is_sufficient = result.confidence >= self.config.sufficient_threshold
                && result.items.len() >= self.config.min_items;
            if is_sufficient {
                // Return this result immediately, even if an earlier (thin)
                // result happened to score higher.
                best = Some(result);
                sufficient = true;
                break;
            }
            let improves = best
                .as_ref()
                .map(|b| result.confidence > b.confidence)
                .unwrap_or(true);
            if improves {
                best = Some(result);
            }
        }

        if let Some(lease) = lease {
            lease.close().await;
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        let mut result = match best {
            // When every strategy came up empty, the adaptive diagnosis
            // ("no header containers" and friends) is the most useful answer.
            Some(b) if b.is_empty() && adaptive_diagnosis.is_some() => {
                adaptive_diagnosis.expect("checked above")
            }
            Some(b) => b,
            None => StrategyResult::empty(StrategyKind::AdaptiveProbe, reason::NO_HEADER_CONTAINERS),
        };
        result.metadata.run_id = run_id;

        if sufficient {
            if let (Some(cache), Some(hint)) = (&self.hints, &result.hint) {
                let ttl = hint_ttl_secs(result.metadata.strategy);
                cache.store(&domain, hint, ttl).await;
                debug!(%domain, ttl, "hints persisted");
            }
        }

        info!(
            %domain,
            strategy = result.metadata.strategy.as_str(),
            items = result.items.len(),
            confidence = result.confidence,
            "navigation discovery finished"
        );
        Ok(result)
    }
}

/// Host portion of a URL, lowercased, `www.` stripped.
fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.Shop.Example.com/a/b"), "shop.example.com");
        assert_eq!(domain_of("https://nike.com"), "nike.com");
        assert_eq!(domain_of("not a url"), "");
    }
}
