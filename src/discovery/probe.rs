//! Interaction probe: the hover→click→poll state machine for one trigger.
//!
//! Panel detection is differential: a snapshot of visible panel containers is
//! taken before the interaction, and a panel counts as revealed only if its
//! key was absent from the baseline and it clears the size/link thresholds.
//! Polling uses increasing wait checkpoints instead of one fixed sleep, so
//! fast sites answer quickly and slow ones still get their budget.
//!
//! Probing is strictly sequential — overlapping open panels corrupt each
//! other's extraction — so the probe dismisses (mouse-off plus quirk delay)
//! before the caller moves to the next trigger.

use super::triggers::Toggler;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::dom;
use crate::driver::PageHandle;
use crate::site::quirks::SiteQuirk;
use crate::types::InteractionMode;
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Probe states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Hovering,
    PollingAfterHover,
    Clicking,
    PollingAfterClick,
    Found,
    Failed,
}

/// A revealed panel, addressable for extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRef {
    pub selector: String,
    /// Index among the selector's currently visible matches.
    pub match_index: u32,
    /// Identity key for baseline diffing.
    pub key: String,
    pub area: f64,
    pub link_count: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    panels: Vec<PanelRef>,
}

/// Outcome of probing one trigger.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub panel: Option<PanelRef>,
    /// Which interaction opened the panel, when one did.
    pub opened_by: Option<InteractionMode>,
    /// States traversed, ending in `Found` or `Failed`. Diagnostic, and lets
    /// tests pin the exact choreography.
    pub path: Vec<ProbeState>,
}

impl ProbeOutcome {
    pub fn final_state(&self) -> ProbeState {
        *self.path.last().unwrap_or(&ProbeState::Idle)
    }
}

/// Drives the interaction protocol against one trigger at a time.
pub struct InteractionProbe<'a> {
    page: &'a dyn PageHandle,
    clock: &'a dyn Clock,
    config: &'a EngineConfig,
    quirk: &'a SiteQuirk,
    panel_selectors: &'a [String],
}

impl<'a> InteractionProbe<'a> {
    pub fn new(
        page: &'a dyn PageHandle,
        clock: &'a dyn Clock,
        config: &'a EngineConfig,
        quirk: &'a SiteQuirk,
        panel_selectors: &'a [String],
    ) -> Self {
        Self {
            page,
            clock,
            config,
            quirk,
            panel_selectors,
        }
    }

    /// Probe one trigger. `preferred` short-circuits to a learned mode;
    /// `allow_fallback` permits trying the other mode after a miss.
    ///
    /// Failure of both modes is not an error — the trigger just contributes
    /// nothing.
    pub async fn probe(
        &self,
        toggler: &Toggler,
        preferred: Option<InteractionMode>,
        allow_fallback: bool,
    ) -> Result<ProbeOutcome> {
        let baseline = self.snapshot_keys().await?;

        let first = match preferred {
            Some(InteractionMode::Click) => InteractionMode::Click,
            _ => InteractionMode::Hover,
        };

        let mut path = vec![ProbeState::Idle];

        if let Some(panel) = self.attempt(toggler, first, &baseline, &mut path).await? {
            path.push(ProbeState::Found);
            return Ok(ProbeOutcome {
                panel: Some(panel),
                opened_by: Some(first),
                path,
            });
        }

        if allow_fallback {
            let second = match first {
                InteractionMode::Hover => InteractionMode::Click,
                _ => InteractionMode::Hover,
            };
            if let Some(panel) = self.attempt(toggler, second, &baseline, &mut path).await? {
                path.push(ProbeState::Found);
                return Ok(ProbeOutcome {
                    panel: Some(panel),
                    opened_by: Some(second),
                    path,
                });
            }
        }

        debug!(trigger = %toggler.text, "no panel revealed");
        path.push(ProbeState::Failed);
        Ok(ProbeOutcome {
            panel: None,
            opened_by: None,
            path,
        })
    }

    /// One interaction attempt plus its polling phase.
    async fn attempt(
        &self,
        toggler: &Toggler,
        mode: InteractionMode,
        baseline: &HashSet<String>,
        path: &mut Vec<ProbeState>,
    ) -> Result<Option<PanelRef>> {
        let (interact_state, poll_state, checkpoints) = match mode {
            InteractionMode::Hover => (
                ProbeState::Hovering,
                ProbeState::PollingAfterHover,
                &self.config.hover_poll_checkpoints_ms,
            ),
            _ => (
                ProbeState::Clicking,
                ProbeState::PollingAfterClick,
                &self.config.click_poll_checkpoints_ms,
            ),
        };

        path.push(interact_state);
        let interacted = match mode {
            InteractionMode::Hover => self.page.hover(&toggler.selector).await,
            _ => self.page.click(&toggler.selector).await,
        };
        if let Err(e) = interacted {
            if e.is_fatal() {
                return Err(e.into());
            }
            debug!(trigger = %toggler.text, ?mode, "interaction failed: {e}");
            return Ok(None);
        }

        if self.quirk.hover_settle_ms > 0 {
            self.clock
                .sleep(Duration::from_millis(self.quirk.hover_settle_ms))
                .await;
        }

        path.push(poll_state);
        let mut waited = 0u64;
        for &checkpoint in checkpoints {
            let step = checkpoint.saturating_sub(waited);
            if step > 0 {
                self.clock.sleep(Duration::from_millis(step)).await;
                waited = checkpoint;
            }
            if let Some(panel) = self.diff_panels(baseline).await? {
                return Ok(Some(panel));
            }
        }
        Ok(None)
    }

    /// Reset page state before the next trigger: pointer to a neutral corner,
    /// then the quirk-configured dismiss delay.
    pub async fn dismiss(&self) -> Result<()> {
        if let Err(e) = self.page.move_mouse(4.0, 4.0).await {
            if e.is_fatal() {
                return Err(e.into());
            }
            debug!("mouse-off failed: {e}");
        }
        let delay = if self.quirk.needs_mouse_off_between_hovers {
            self.quirk.mouse_off_delay_ms
        } else {
            self.quirk.mouse_off_delay_ms.min(120)
        };
        if delay > 0 {
            self.clock.sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    /// Keys of panels already visible before interacting.
    async fn snapshot_keys(&self) -> Result<HashSet<String>> {
        Ok(self
            .visible_panels()
            .await?
            .into_iter()
            .map(|p| p.key)
            .collect())
    }

    /// The best newly visible panel clearing the thresholds, if any.
    async fn diff_panels(&self, baseline: &HashSet<String>) -> Result<Option<PanelRef>> {
        let panels = self.visible_panels().await?;
        Ok(panels
            .into_iter()
            .filter(|p| !baseline.contains(&p.key))
            .filter(|p| p.area >= self.config.min_panel_area)
            .filter(|p| p.link_count as usize >= self.config.min_panel_links)
            .max_by(|a, b| a.area.partial_cmp(&b.area).unwrap_or(std::cmp::Ordering::Equal)))
    }

    async fn visible_panels(&self) -> Result<Vec<PanelRef>> {
        let params = json!({ "panelSelectors": self.panel_selectors });
        let response = dom::eval_call::<ProbeResponse>(
            self.page,
            dom::PANEL_PROBE_JS,
            &params,
            self.config.eval_timeout_ms,
        )
        .await?;
        Ok(response.map(|r| r.panels).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::discovery::CandidateSource;
    use crate::dom::markers;
    use crate::driver::scripted::ScriptedPage;

    fn toggler() -> Toggler {
        Toggler {
            text: "Women".into(),
            relative_selector: "ul > li:nth-child(1) > a".into(),
            selector: "header > nav > ul > li:nth-child(1) > a".into(),
            source: CandidateSource::Discovery,
            href: Some("/women".into()),
            preferred_interaction: None,
        }
    }

    fn panel(key: &str, area: f64, links: u32) -> serde_json::Value {
        json!({
            "selector": ".mega-menu",
            "matchIndex": 0,
            "key": key,
            "area": area,
            "linkCount": links,
        })
    }

    fn selectors() -> Vec<String> {
        vec![".mega-menu".to_string()]
    }

    #[tokio::test]
    async fn test_hover_reveals_panel() {
        let page = ScriptedPage::new("https://x.com")
            // Baseline: nothing visible. First poll: panel appeared.
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(markers::PANEL_PROBE, json!({"panels": [panel("k1", 50_000.0, 12)]}));

        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk::default();
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        let outcome = probe.probe(&toggler(), None, true).await.unwrap();
        assert_eq!(outcome.opened_by, Some(InteractionMode::Hover));
        assert_eq!(outcome.final_state(), ProbeState::Found);
        assert_eq!(outcome.panel.unwrap().key, "k1");

        assert_eq!(page.hovered().len(), 1);
        assert!(page.clicked().is_empty());
        // First checkpoint only: 120ms.
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(120)]);
    }

    #[tokio::test]
    async fn test_click_fallback_after_hover_misses() {
        let page = ScriptedPage::new("https://x.com")
            // Baseline empty, all hover polls empty, first click poll hits.
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(markers::PANEL_PROBE, json!({"panels": [panel("k2", 30_000.0, 8)]}));

        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk::default();
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        let outcome = probe.probe(&toggler(), None, true).await.unwrap();
        assert_eq!(outcome.opened_by, Some(InteractionMode::Click));
        assert_eq!(page.hovered().len(), 1);
        assert_eq!(page.clicked().len(), 1);

        // Hover checkpoints 120/260/400 → steps 120,140,140; then the first
        // click checkpoint at 120.
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(120),
                Duration::from_millis(140),
                Duration::from_millis(140),
                Duration::from_millis(120),
            ]
        );
    }

    #[tokio::test]
    async fn test_both_modes_fail_is_not_an_error() {
        let page = ScriptedPage::new("https://x.com")
            .respond(markers::PANEL_PROBE, json!({"panels": []}));

        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk::default();
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        let outcome = probe.probe(&toggler(), None, true).await.unwrap();
        assert!(outcome.panel.is_none());
        assert_eq!(outcome.final_state(), ProbeState::Failed);
    }

    #[tokio::test]
    async fn test_preexisting_panel_does_not_count() {
        let page = ScriptedPage::new("https://x.com")
            // The same big panel is visible before and after — not "revealed".
            .respond(markers::PANEL_PROBE, json!({"panels": [panel("old", 90_000.0, 30)]}));

        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk::default();
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        let outcome = probe.probe(&toggler(), None, false).await.unwrap();
        assert!(outcome.panel.is_none());
    }

    #[tokio::test]
    async fn test_small_or_linkless_panels_rejected() {
        let page = ScriptedPage::new("https://x.com")
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(
                markers::PANEL_PROBE,
                json!({"panels": [panel("tiny", 500.0, 10), panel("sparse", 60_000.0, 2)]}),
            );

        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk::default();
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        let outcome = probe.probe(&toggler(), None, false).await.unwrap();
        assert!(outcome.panel.is_none());
    }

    #[tokio::test]
    async fn test_learned_click_mode_skips_hover() {
        let page = ScriptedPage::new("https://x.com")
            .respond(markers::PANEL_PROBE, json!({"panels": []}))
            .respond(markers::PANEL_PROBE, json!({"panels": [panel("k3", 40_000.0, 9)]}));

        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk::default();
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        let outcome = probe
            .probe(&toggler(), Some(InteractionMode::Click), true)
            .await
            .unwrap();
        assert_eq!(outcome.opened_by, Some(InteractionMode::Click));
        assert!(page.hovered().is_empty());
        assert_eq!(page.clicked().len(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_moves_pointer_and_waits() {
        let page = ScriptedPage::new("https://x.com");
        let clock = FakeClock::new();
        let config = EngineConfig::default();
        let quirk = SiteQuirk {
            needs_mouse_off_between_hovers: true,
            mouse_off_delay_ms: 250,
            ..SiteQuirk::default()
        };
        let sels = selectors();
        let probe = InteractionProbe::new(&page, &clock, &config, &quirk, &sels);

        probe.dismiss().await.unwrap();
        assert_eq!(page.mouse_moves(), vec![(4.0, 4.0)]);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
    }
}
