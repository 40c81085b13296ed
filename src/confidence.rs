//! Confidence scoring for strategy results.
//!
//! The thresholds and bonuses here are empirically tuned against observed
//! storefronts, not derived invariants. They live in [`ConfidenceWeights`] as
//! named, overridable configuration and are candidates for recalibration
//! against a held-out site corpus before being used for hard pass/fail gating.

/// Named scoring constants. Defaults are the tuned carry-over values.
#[derive(Debug, Clone)]
pub struct ConfidenceWeights {
    /// Flat credit for finding anything at all.
    pub base: f64,
    /// Weight of the saturating item-count term.
    pub item_weight: f64,
    /// Item count at which the count term saturates.
    pub item_saturation: usize,
    /// Weight of the triggers-yielding / triggers-probed ratio.
    pub success_ratio_weight: f64,
    /// Credit assumed for strategies that probe nothing (static collection).
    pub no_probe_ratio: f64,
    /// Bonus when the result has a real two-level hierarchy.
    pub hierarchy_bonus: f64,
    /// Unique-URL ratio below which the duplicate penalty applies.
    pub duplicate_ratio_floor: f64,
    /// Flat penalty applied below the floor.
    pub duplicate_penalty: f64,

    /// Tiered confidence for the pattern-matched path.
    pub pattern_high: f64,
    pub pattern_high_count: usize,
    pub pattern_medium: f64,
    pub pattern_medium_count: usize,
    pub pattern_low: f64,

    /// Ceilings for the low-trust strategies.
    pub sector_ceiling: f64,
    pub fallback_links_ceiling: f64,
    pub mobile_ceiling: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: 0.1,
            item_weight: 0.5,
            item_saturation: 50,
            success_ratio_weight: 0.25,
            no_probe_ratio: 0.5,
            hierarchy_bonus: 0.15,
            duplicate_ratio_floor: 0.8,
            duplicate_penalty: 0.2,
            pattern_high: 0.95,
            pattern_high_count: 50,
            pattern_medium: 0.8,
            pattern_medium_count: 10,
            pattern_low: 0.6,
            sector_ceiling: 0.55,
            fallback_links_ceiling: 0.45,
            mobile_ceiling: 0.65,
        }
    }
}

/// Inputs to a confidence computation.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    /// Deduplicated item count.
    pub item_count: usize,
    pub triggers_probed: u32,
    pub triggers_yielding: u32,
    /// Any item at hierarchy level 2?
    pub has_hierarchy: bool,
    /// unique URLs / URL-bearing items before dedup.
    pub unique_url_ratio: f64,
}

/// Score a probing-style result.
///
/// Monotone non-decreasing in `item_count` with other inputs fixed, and
/// always clamped to `[0, ceiling] ⊆ [0, 1]`.
pub fn score(inputs: &ScoreInputs, weights: &ConfidenceWeights, ceiling: f64) -> f64 {
    if inputs.item_count == 0 {
        return 0.0;
    }

    let count_term = (inputs.item_count as f64 / weights.item_saturation.max(1) as f64).min(1.0);
    let mut score = weights.base + weights.item_weight * count_term;

    let ratio = if inputs.triggers_probed > 0 {
        inputs.triggers_yielding as f64 / inputs.triggers_probed as f64
    } else {
        weights.no_probe_ratio
    };
    score += weights.success_ratio_weight * ratio.clamp(0.0, 1.0);

    if inputs.has_hierarchy {
        score += weights.hierarchy_bonus;
    }

    if inputs.unique_url_ratio < weights.duplicate_ratio_floor {
        score -= weights.duplicate_penalty;
    }

    score.clamp(0.0, ceiling.clamp(0.0, 1.0))
}

/// Tiered confidence for the pattern-matched path, which trusts its
/// pre-authored selectors more than generic probing.
pub fn pattern_tiered(item_count: usize, weights: &ConfidenceWeights) -> f64 {
    if item_count == 0 {
        0.0
    } else if item_count > weights.pattern_high_count {
        weights.pattern_high
    } else if item_count > weights.pattern_medium_count {
        weights.pattern_medium
    } else {
        weights.pattern_low
    }
}
