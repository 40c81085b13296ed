//! Header locator: score candidate navigation containers on the page.
//!
//! One DOM round-trip collects raw geometry and link samples for every
//! candidate container; all classification and scoring happens engine-side
//! so the heuristics stay testable without a browser.

use super::CandidateSource;
use crate::config::EngineConfig;
use crate::dom;
use crate::driver::PageHandle;
use crate::site::keywords::KeywordSet;
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Rendered geometry of a header candidate.
#[derive(Debug, Clone, Copy)]
pub struct HeaderBounds {
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A container hypothesized to be the site's primary navigation region.
#[derive(Debug, Clone)]
pub struct HeaderCandidate {
    pub selector: String,
    pub source: CandidateSource,
    /// Unbounded positive score, used only for ranking.
    pub score: f64,
    pub bounds: HeaderBounds,
    /// Interactive (link/button) descendants.
    pub interactive_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeaderScanResponse {
    viewport_width: f64,
    #[allow(dead_code)]
    viewport_height: f64,
    candidates: Vec<RawCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    selector: String,
    top: f64,
    width: f64,
    height: f64,
    link_count: u32,
    button_count: u32,
    #[serde(default)]
    position: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    class_name: String,
    #[serde(default)]
    sample_link_texts: Vec<String>,
}

/// Locates and ranks header candidates.
pub struct HeaderLocator<'a> {
    keywords: &'a KeywordSet,
    config: &'a EngineConfig,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(keywords: &'a KeywordSet, config: &'a EngineConfig) -> Self {
        Self { keywords, config }
    }

    /// Rank header candidates, best first.
    ///
    /// A cached selector is validated against the same gate first and, when
    /// it passes, returned alone — skipping full discovery. An empty result
    /// is a normal outcome the caller advances past.
    pub async fn locate(
        &self,
        page: &dyn PageHandle,
        cached_selector: Option<&str>,
    ) -> Result<Vec<HeaderCandidate>> {
        if let Some(cached) = cached_selector {
            if let Some(candidate) = self.scan(page, &[cached.to_string()], CandidateSource::Cache).await?.into_iter().next()
            {
                debug!(selector = cached, "cached header selector validated");
                return Ok(vec![candidate]);
            }
            debug!(selector = cached, "cached header selector rejected, rediscovering");
        }

        let mut candidates = self
            .scan(page, &self.keywords.header_candidates, CandidateSource::Discovery)
            .await?;
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(candidates)
    }

    async fn scan(
        &self,
        page: &dyn PageHandle,
        selectors: &[String],
        source: CandidateSource,
    ) -> Result<Vec<HeaderCandidate>> {
        let params = json!({
            "candidateSelectors": selectors,
            "maxCandidates": 24,
            "linkSampleSize": self.config.header_link_sample,
        });

        let Some(response) = dom::eval_call::<HeaderScanResponse>(
            page,
            dom::HEADER_SCAN_JS,
            &params,
            self.config.eval_timeout_ms,
        )
        .await?
        else {
            return Ok(Vec::new());
        };

        let viewport_width = response.viewport_width.max(1.0);
        Ok(response
            .candidates
            .into_iter()
            .filter(|raw| self.passes_gate(raw, viewport_width))
            .map(|raw| {
                let score = self.score(&raw, viewport_width);
                HeaderCandidate {
                    selector: raw.selector,
                    source,
                    score,
                    bounds: HeaderBounds {
                        top: raw.top,
                        width: raw.width,
                        height: raw.height,
                    },
                    interactive_count: raw.link_count + raw.button_count,
                }
            })
            .collect())
    }

    /// The validation gate: every condition must hold.
    fn passes_gate(&self, raw: &RawCandidate, viewport_width: f64) -> bool {
        if raw.top > self.config.header_top_cutoff_px {
            return false;
        }
        if raw.width < self.config.header_min_width_ratio * viewport_width {
            return false;
        }
        if raw.width <= 0.0 || raw.height <= 0.0 {
            return false;
        }
        if raw.link_count + raw.button_count == 0 {
            return false;
        }
        // Utility dominance: a candidate whose sampled links are almost all
        // "sign in / cart / help" is a utility bar, not navigation.
        if !raw.sample_link_texts.is_empty() {
            let utility = raw
                .sample_link_texts
                .iter()
                .filter(|t| self.keywords.is_utility(t))
                .count();
            let ratio = utility as f64 / raw.sample_link_texts.len() as f64;
            if ratio > self.config.utility_dominance_ratio {
                return false;
            }
        }
        true
    }

    fn score(&self, raw: &RawCandidate, viewport_width: f64) -> f64 {
        let mut score = 0.0;

        // Closer to the top scores higher.
        let cutoff = self.config.header_top_cutoff_px.max(1.0);
        score += ((cutoff - raw.top.max(0.0)) / cutoff).max(0.0) * 10.0;

        score += (raw.width / viewport_width).min(1.0) * 5.0;
        score += (raw.link_count + raw.button_count).min(30) as f64 * 0.5;

        if raw.position == "fixed" || raw.position == "sticky" {
            score += 5.0;
        }
        if raw.role == "navigation" {
            score += 5.0;
        }
        let class_lower = raw.class_name.to_lowercase();
        if class_lower.contains("nav") || class_lower.contains("header") || class_lower.contains("menu") {
            score += 3.0;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::markers;
    use crate::driver::scripted::ScriptedPage;
    use serde_json::json;

    fn candidate_json(selector: &str, top: f64, width: f64, links: u64, texts: Vec<&str>) -> serde_json::Value {
        json!({
            "selector": selector,
            "top": top,
            "width": width,
            "height": 80.0,
            "linkCount": links,
            "buttonCount": 0,
            "position": "static",
            "role": "",
            "className": "",
            "sampleLinkTexts": texts,
        })
    }

    fn scan_response(candidates: Vec<serde_json::Value>) -> serde_json::Value {
        json!({"viewportWidth": 1920.0, "viewportHeight": 1080.0, "candidates": candidates})
    }

    #[tokio::test]
    async fn test_ranked_by_score() {
        let page = ScriptedPage::new("https://x.com").respond(
            markers::HEADER_SCAN,
            scan_response(vec![
                candidate_json("footer-ish", 290.0, 500.0, 2, vec!["About"]),
                candidate_json("header > nav", 10.0, 1900.0, 12, vec!["Women", "Men", "Kids"]),
            ]),
        );

        let config = EngineConfig::default();
        let locator = HeaderLocator::new(KeywordSet::builtin(), &config);
        let candidates = locator.locate(&page, None).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].selector, "header > nav");
        assert!(candidates[0].score > candidates[1].score);
        assert_eq!(candidates[0].source, CandidateSource::Discovery);
    }

    #[tokio::test]
    async fn test_gate_rejections() {
        let page = ScriptedPage::new("https://x.com").respond(
            markers::HEADER_SCAN,
            scan_response(vec![
                // Too far down.
                candidate_json("low", 600.0, 1900.0, 8, vec!["Women"]),
                // Too narrow (< 20% of 1920).
                candidate_json("narrow", 10.0, 200.0, 8, vec!["Women"]),
                // No interactive descendants.
                candidate_json("dead", 10.0, 1900.0, 0, vec![]),
                // Utility-dominated.
                candidate_json(
                    "utility-bar",
                    10.0,
                    1900.0,
                    5,
                    vec!["Sign In", "Cart", "Help", "Track Order", "Gift Cards"],
                ),
            ]),
        );

        let config = EngineConfig::default();
        let locator = HeaderLocator::new(KeywordSet::builtin(), &config);
        let candidates = locator.locate(&page, None).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_cached_selector_short_circuits() {
        let page = ScriptedPage::new("https://x.com")
            // First scan validates the cached selector...
            .respond(
                markers::HEADER_SCAN,
                scan_response(vec![candidate_json(
                    "#site-header",
                    0.0,
                    1900.0,
                    10,
                    vec!["Women", "Men"],
                )]),
            );

        let config = EngineConfig::default();
        let locator = HeaderLocator::new(KeywordSet::builtin(), &config);
        let candidates = locator.locate(&page, Some("#site-header")).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, CandidateSource::Cache);
    }

    #[tokio::test]
    async fn test_no_response_is_empty_not_error() {
        let page = ScriptedPage::new("https://x.com");
        let config = EngineConfig::default();
        let locator = HeaderLocator::new(KeywordSet::builtin(), &config);
        assert!(locator.locate(&page, None).await.unwrap().is_empty());
    }
}
