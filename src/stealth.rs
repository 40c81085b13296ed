//! Behavioral warm-up for domains that run bot detection.
//!
//! A bounded, randomized sequence of pointer moves, one scroll pair, and a
//! few brief hovers over clickable elements near the top of the page, played
//! before discovery begins. Strictly best-effort: every failure is swallowed
//! with a debug note — the simulator must never fail the run.

use crate::clock::Clock;
use crate::dom;
use crate::driver::PageHandle;
use crate::site::quirks::SiteQuirk;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Attribute used to tag warm-up hover targets.
const WARMUP_ATTR: &str = "data-navscout-warmup";

#[derive(Debug, Deserialize)]
struct WarmupTargets {
    items: Vec<WarmupItem>,
}

#[derive(Debug, Deserialize)]
struct WarmupItem {
    locator: String,
}

/// One step of the pre-planned warm-up choreography.
#[derive(Debug, Clone)]
enum WarmupStep {
    Move { x: f64, y: f64, pause_ms: u64 },
    Scroll { dy: f64, pause_ms: u64 },
}

pub struct AntiBotSimulator {
    /// How many pointer moves to play.
    pub mouse_moves: std::ops::RangeInclusive<u32>,
    /// How many top-of-page elements to hover.
    pub hover_samples: usize,
}

impl Default for AntiBotSimulator {
    fn default() -> Self {
        Self {
            mouse_moves: 4..=7,
            hover_samples: 3,
        }
    }
}

impl AntiBotSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play the warm-up if `domain` is on the watch-list; otherwise no-op.
    pub async fn simulate(
        &self,
        page: &dyn PageHandle,
        domain: &str,
        quirk: &SiteQuirk,
        clock: &dyn Clock,
    ) {
        if !quirk.anti_bot_watch {
            return;
        }
        debug!(domain, "playing anti-bot warm-up");

        // Plan all randomness up front; the RNG is not Send and must not be
        // held across await points.
        let steps = self.plan();

        for step in steps {
            match step {
                WarmupStep::Move { x, y, pause_ms } => {
                    if let Err(e) = page.move_mouse(x, y).await {
                        debug!("warm-up mouse move skipped: {e}");
                    }
                    clock.sleep(Duration::from_millis(pause_ms)).await;
                }
                WarmupStep::Scroll { dy, pause_ms } => {
                    if let Err(e) = page.scroll_by(0.0, dy).await {
                        debug!("warm-up scroll skipped: {e}");
                    }
                    clock.sleep(Duration::from_millis(pause_ms)).await;
                }
            }
        }

        // Brief hovers over a few clickable elements near the top.
        let params = json!({
            "selectors": ["header a", "nav a", "header button"],
            "maxItems": self.hover_samples,
            "maxTop": 300.0,
            "markAttr": WARMUP_ATTR,
        });
        let targets =
            match dom::eval_call::<WarmupTargets>(page, dom::NAV_ITEMS_JS, &params, 3_000).await {
                Ok(Some(t)) => t.items,
                Ok(None) => Vec::new(),
                Err(e) => {
                    debug!("warm-up target scan skipped: {e}");
                    Vec::new()
                }
            };
        for target in targets {
            if let Err(e) = page.hover(&target.locator).await {
                debug!("warm-up hover skipped: {e}");
            }
            clock.sleep(Duration::from_millis(90)).await;
        }

        if let Err(e) = page.move_mouse(6.0, 6.0).await {
            debug!("warm-up mouse park skipped: {e}");
        }
    }

    fn plan(&self) -> Vec<WarmupStep> {
        let mut rng = rand::thread_rng();
        let mut steps = Vec::new();

        let moves = rng.gen_range(self.mouse_moves.clone());
        for _ in 0..moves {
            steps.push(WarmupStep::Move {
                x: rng.gen_range(80.0..1200.0),
                y: rng.gen_range(60.0..520.0),
                pause_ms: rng.gen_range(40..140),
            });
        }

        let depth = rng.gen_range(280.0..620.0);
        steps.push(WarmupStep::Scroll {
            dy: depth,
            pause_ms: rng.gen_range(150..350),
        });
        steps.push(WarmupStep::Scroll {
            dy: -depth,
            pause_ms: rng.gen_range(100..250),
        });

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::driver::scripted::ScriptedPage;

    #[tokio::test]
    async fn test_noop_for_unlisted_domain() {
        let page = ScriptedPage::new("https://calm.example");
        let clock = FakeClock::new();
        let quirk = SiteQuirk::default();

        AntiBotSimulator::new()
            .simulate(&page, "calm.example", &quirk, &clock)
            .await;

        assert!(page.mouse_moves().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_watchlisted_domain_gets_warmup() {
        let page = ScriptedPage::new("https://guarded.example").respond(
            crate::dom::markers::NAV_ITEMS,
            serde_json::json!({"items": [
                {"text": "Women", "href": "/w", "locator": "[data-navscout-warmup=\"0\"]", "top": 10.0}
            ]}),
        );
        let clock = FakeClock::new();
        let quirk = SiteQuirk {
            anti_bot_watch: true,
            ..SiteQuirk::default()
        };

        AntiBotSimulator::new()
            .simulate(&page, "guarded.example", &quirk, &clock)
            .await;

        // Moves plus the final park, a scroll pair, one hover.
        assert!(page.mouse_moves().len() >= 5);
        assert_eq!(page.hovered().len(), 1);
        assert!(!clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_broken_page_never_fails_the_run() {
        let page = ScriptedPage::new("https://guarded.example");
        page.poison("tab crashed");
        let clock = FakeClock::new();
        let quirk = SiteQuirk {
            anti_bot_watch: true,
            ..SiteQuirk::default()
        };

        // Must not panic or propagate despite every call failing.
        AntiBotSimulator::new()
            .simulate(&page, "guarded.example", &quirk, &clock)
            .await;
    }
}
