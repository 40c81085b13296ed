//! Discovery strategies behind a single capability: `run(context) -> result`.
//!
//! There is no class hierarchy here — each strategy is one implementation of
//! [`NavStrategy`], selected through a data-driven priority list
//! ([`default_chain`]). Expected failures never error: a strategy that finds
//! nothing returns an empty result with a reason code, and the orchestrator
//! simply advances.

pub mod adaptive;
pub mod fallback_links;
pub mod mega_menu;
pub mod mobile;
pub mod pattern_match;
pub mod sector;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::driver::PageHandle;
use crate::hints::Hint;
use crate::site::keywords::KeywordSet;
use crate::site::patterns::{PatternLibrary, SectorTemplate};
use crate::site::quirks::SiteQuirk;
use crate::types::{
    dedup_by_url, InteractionMode, NavigationItem, ResultMetadata, StrategyKind, StrategyResult,
};
use crate::{confidence, confidence::ScoreInputs};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Cooperative cancellation: "stop probing remaining triggers and return
/// what was found". Checked between strategies and between triggers — never
/// inside a DOM round-trip, which is atomic.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Site-level interaction-mode inference, accumulated across probed triggers
/// within one run so untested triggers skip straight to the learned mode.
#[derive(Debug, Default)]
pub struct ModeInference {
    hover_opens: u32,
    click_opens: u32,
}

impl ModeInference {
    pub fn record(&mut self, mode: InteractionMode) {
        match mode {
            InteractionMode::Hover => self.hover_opens += 1,
            InteractionMode::Click => self.click_opens += 1,
            InteractionMode::Mixed => {}
        }
    }

    /// Mode to lead with on the next trigger, once the signal is consistent.
    pub fn preferred(&self) -> Option<InteractionMode> {
        let total = self.hover_opens + self.click_opens;
        if total < 2 {
            return None;
        }
        if self.click_opens > 0 && self.hover_opens == 0 {
            Some(InteractionMode::Click)
        } else if self.hover_opens > 0 && self.click_opens == 0 {
            Some(InteractionMode::Hover)
        } else {
            None // mixed — keep the default protocol
        }
    }

    /// Site-level summary for result metadata.
    pub fn site_mode(&self) -> Option<InteractionMode> {
        match (self.hover_opens, self.click_opens) {
            (0, 0) => None,
            (_, 0) => Some(InteractionMode::Hover),
            (0, _) => Some(InteractionMode::Click),
            _ => Some(InteractionMode::Mixed),
        }
    }
}

/// Mutable per-run state threaded through every strategy.
#[derive(Default)]
pub struct RunState {
    pub modes: ModeInference,
}

/// Everything a strategy needs to run. Built fresh per strategy invocation;
/// the engine owns the long-lived pieces.
pub struct StrategyContext<'a> {
    pub page: &'a dyn PageHandle,
    pub url: String,
    pub domain: String,
    pub quirk: SiteQuirk,
    pub hint: Option<Hint>,
    pub keywords: &'a KeywordSet,
    pub patterns: &'a PatternLibrary,
    pub sectors: &'a [SectorTemplate],
    pub config: &'a EngineConfig,
    pub clock: &'a dyn Clock,
    pub stop: StopFlag,
    pub run: &'a mut RunState,
    pub run_id: Uuid,
}

/// One discovery approach.
#[async_trait]
pub trait NavStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether this strategy should run on the desktop-sized page. The
    /// mobile fallback is the one exception: it drives the original page.
    fn wants_desktop(&self) -> bool {
        true
    }

    /// Run the strategy. Errors only for unrecoverable driver loss; every
    /// expected failure mode is an `Ok` result with a reason code.
    async fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyResult>;
}

/// The fixed priority order the orchestrator walks.
pub fn default_chain() -> Vec<Box<dyn NavStrategy>> {
    vec![
        Box::new(pattern_match::PatternMatchStrategy),
        Box::new(mega_menu::MegaMenuStrategy),
        Box::new(adaptive::AdaptiveProbeStrategy),
        Box::new(sector::SectorTemplateStrategy),
        Box::new(fallback_links::FallbackLinkStrategy),
        Box::new(mobile::MobileFallbackStrategy),
    ]
}

/// Raw strategy output before dedup and scoring.
pub(crate) struct RawOutcome {
    pub items: Vec<NavigationItem>,
    pub triggers_probed: u32,
    pub triggers_yielding: u32,
    /// Reason reported when the item list ends up empty.
    pub empty_reason: &'static str,
    pub hint: Option<Hint>,
    /// Confidence ceiling for this strategy.
    pub ceiling: f64,
    /// Use the pattern-path tiered confidence instead of the probing score.
    pub tiered: bool,
}

/// Dedup, score, and package a strategy's raw output.
pub(crate) async fn finalize(
    kind: StrategyKind,
    raw: RawOutcome,
    cx: &mut StrategyContext<'_>,
    started: Instant,
) -> StrategyResult {
    let raw_count = raw.items.len();
    let (items, unique_ratio) = dedup_by_url(raw.items, &cx.url);

    let confidence = if raw.tiered {
        confidence::pattern_tiered(items.len(), &cx.config.weights)
    } else {
        let inputs = ScoreInputs {
            item_count: items.len(),
            triggers_probed: raw.triggers_probed,
            triggers_yielding: raw.triggers_yielding,
            has_hierarchy: items.iter().any(|i| i.hierarchy_level >= 2),
            unique_url_ratio: unique_ratio,
        };
        confidence::score(&inputs, &cx.config.weights, raw.ceiling)
    };

    let mut metadata = ResultMetadata::new(kind);
    metadata.run_id = cx.run_id;
    metadata.elapsed_ms = started.elapsed().as_millis() as u64;
    metadata.triggers_probed = raw.triggers_probed;
    metadata.triggers_yielding = raw.triggers_yielding;
    metadata.raw_item_count = raw_count;
    metadata.unique_url_ratio = unique_ratio;
    metadata.viewport = cx.page.viewport().await.ok();
    metadata.interaction_mode = cx.run.modes.site_mode();
    if items.is_empty() {
        metadata.reason = Some(raw.empty_reason.to_string());
    } else if cx.stop.is_stopped() {
        metadata.reason = Some(crate::types::reason::STOPPED.to_string());
    }

    StrategyResult {
        items,
        confidence,
        metadata,
        hint: raw.hint.filter(|h| !h.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag() {
        let flag = StopFlag::new();
        assert!(!flag.is_stopped());
        let other = flag.clone();
        other.request_stop();
        assert!(flag.is_stopped());
    }

    #[test]
    fn test_mode_inference_needs_two_samples() {
        let mut modes = ModeInference::default();
        assert_eq!(modes.preferred(), None);
        modes.record(InteractionMode::Click);
        assert_eq!(modes.preferred(), None);
        modes.record(InteractionMode::Click);
        assert_eq!(modes.preferred(), Some(InteractionMode::Click));
        assert_eq!(modes.site_mode(), Some(InteractionMode::Click));
    }

    #[test]
    fn test_mixed_modes_have_no_preference() {
        let mut modes = ModeInference::default();
        modes.record(InteractionMode::Hover);
        modes.record(InteractionMode::Click);
        assert_eq!(modes.preferred(), None);
        assert_eq!(modes.site_mode(), Some(InteractionMode::Mixed));
    }
}
