//! Engine configuration.
//!
//! Every threshold that gates behavior is a named field here rather than a
//! literal buried in logic. The confidence constants in particular are
//! empirically tuned carry-overs, kept overridable — see
//! [`crate::confidence::ConfidenceWeights`].

use crate::confidence::ConfidenceWeights;
use crate::driver::ViewportSize;

/// Tunables for a [`crate::engine::DiscoveryEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// A strategy result at or above this confidence short-circuits the chain.
    pub sufficient_threshold: f64,
    /// ...but only if it also found at least this many items.
    pub min_items: usize,

    /// Viewports narrower than this cannot render mega-menus; a desktop
    /// context is spawned instead.
    pub desktop_cutoff_px: u32,
    pub desktop_viewport: ViewportSize,
    pub mobile_viewport: ViewportSize,
    /// User agent for spawned desktop contexts.
    pub desktop_user_agent: String,

    /// Header candidates must start within this many px of the viewport top.
    pub header_top_cutoff_px: f64,
    /// ...and span at least this fraction of the viewport width.
    pub header_min_width_ratio: f64,
    /// Reject a header candidate when more than this fraction of its sampled
    /// links are utility links (sign in, cart, help, ...).
    pub utility_dominance_ratio: f64,
    /// How many links to sample per candidate for the utility check.
    pub header_link_sample: usize,

    /// Cap on triggers probed per container, to bound exploration cost.
    pub max_trigger_samples: usize,

    /// Cumulative wait checkpoints after a hover, in ms.
    pub hover_poll_checkpoints_ms: Vec<u64>,
    /// Cumulative wait checkpoints after a click fallback (shorter budget).
    pub click_poll_checkpoints_ms: Vec<u64>,
    /// A revealed panel counts only above this rendered area (px²)...
    pub min_panel_area: f64,
    /// ...and with at least this many links inside it.
    pub min_panel_links: usize,

    /// Timeout for a single DOM evaluation round-trip.
    pub eval_timeout_ms: u64,
    /// Timeout for navigation when spawning a desktop context.
    pub navigation_timeout_ms: u64,

    /// Default per-item cap when extracting a single panel.
    pub max_links_per_panel: usize,

    pub weights: ConfidenceWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sufficient_threshold: 0.7,
            min_items: 5,
            desktop_cutoff_px: 1200,
            desktop_viewport: ViewportSize::new(1920, 1080),
            mobile_viewport: ViewportSize::new(390, 844),
            desktop_user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                 AppleWebKit/537.36 (KHTML, like Gecko) \
                                 Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            header_top_cutoff_px: 300.0,
            header_min_width_ratio: 0.2,
            utility_dominance_ratio: 0.8,
            header_link_sample: 20,
            max_trigger_samples: 12,
            hover_poll_checkpoints_ms: vec![120, 260, 400],
            click_poll_checkpoints_ms: vec![120, 300],
            min_panel_area: 8_000.0,
            min_panel_links: 3,
            eval_timeout_ms: 5_000,
            navigation_timeout_ms: 30_000,
            max_links_per_panel: 120,
            weights: ConfidenceWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.sufficient_threshold, 0.7);
        assert_eq!(cfg.min_items, 5);
        assert_eq!(cfg.desktop_viewport.width, 1920);
        assert_eq!(cfg.hover_poll_checkpoints_ms, vec![120, 260, 400]);
        // Click budget must be shorter than the hover budget.
        assert!(
            cfg.click_poll_checkpoints_ms.last().unwrap()
                < cfg.hover_poll_checkpoints_ms.last().unwrap()
        );
    }
}
