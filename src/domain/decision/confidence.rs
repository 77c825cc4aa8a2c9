//! Confidence scoring vocabulary shared by strategies and the engine.

use serde::{Deserialize, Serialize};

/// Recommended starting score on the 0–100 scale.
pub const DEFAULT_BASE_CONFIDENCE: f64 = 75.0;

/// Confidence assigned to every fallback decision.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// A named change applied to the base confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceAdjustment {
    /// Short machine-friendly factor name.
    pub factor: String,
    /// Signed change on the 0–100 scale.
    pub delta: f64,
    /// Human-readable explanation.
    pub reason: String,
}

impl ConfidenceAdjustment {
    pub fn new(factor: impl Into<String>, delta: f64, reason: impl Into<String>) -> Self {
        Self {
            factor: factor.into(),
            delta,
            reason: reason.into(),
        }
    }
}

/// Inclusive band a strategy clamps its raw score into (0–100 scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub min: f64,
    pub max: f64,
}

impl ConfidenceBand {
    /// The recommended band: never claim absolute certainty or failure.
    pub const SAFETY: ConfidenceBand = ConfidenceBand {
        min: 60.0,
        max: 95.0,
    };

    pub fn clamp(&self, score: f64) -> f64 {
        score.clamp(self.min, self.max)
    }
}

/// How a strategy arrived at a decision's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceAssessment {
    /// Starting score on the 0–100 scale.
    pub base_confidence: f64,
    /// Adjustments in the order they were applied.
    pub adjustments: Vec<ConfidenceAdjustment>,
    /// Final score normalized to [0, 1].
    pub final_confidence: f64,
}

impl ConfidenceAssessment {
    /// Sums the adjustments onto `base`, clamps into `band`, and normalizes.
    pub fn from_adjustments(
        base: f64,
        adjustments: Vec<ConfidenceAdjustment>,
        band: ConfidenceBand,
    ) -> Self {
        let raw = adjustments.iter().fold(base, |acc, adj| acc + adj.delta);
        Self {
            base_confidence: base,
            adjustments,
            final_confidence: band.clamp(raw) / 100.0,
        }
    }

    /// An assessment that reports a fixed, already-normalized score.
    pub fn fixed(final_confidence: f64) -> Self {
        Self {
            base_confidence: final_confidence * 100.0,
            adjustments: Vec::new(),
            final_confidence: final_confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn adjustments_are_summed_and_normalized() {
        let assessment = ConfidenceAssessment::from_adjustments(
            DEFAULT_BASE_CONFIDENCE,
            vec![
                ConfidenceAdjustment::new("differentials", 10.0, "multiple differentials considered"),
                ConfidenceAdjustment::new("critical_urgency", -5.0, "critical urgency flagged"),
            ],
            ConfidenceBand::SAFETY,
        );

        assert_eq!(assessment.base_confidence, 75.0);
        assert!((assessment.final_confidence - 0.80).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped_to_upper_bound() {
        let assessment = ConfidenceAssessment::from_adjustments(
            90.0,
            vec![ConfidenceAdjustment::new("bonus", 50.0, "lots of evidence")],
            ConfidenceBand::SAFETY,
        );
        assert!((assessment.final_confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn fixed_assessment_clamps_to_unit_interval() {
        assert_eq!(ConfidenceAssessment::fixed(1.7).final_confidence, 1.0);
        assert_eq!(ConfidenceAssessment::fixed(-0.2).final_confidence, 0.0);
        assert_eq!(ConfidenceAssessment::fixed(0.4).final_confidence, 0.4);
    }

    proptest! {
        #[test]
        fn safety_band_holds_for_any_adjustments(deltas in prop::collection::vec(-100.0f64..100.0, 0..8)) {
            let adjustments = deltas
                .iter()
                .map(|d| ConfidenceAdjustment::new("factor", *d, "generated"))
                .collect();
            let assessment = ConfidenceAssessment::from_adjustments(
                DEFAULT_BASE_CONFIDENCE,
                adjustments,
                ConfidenceBand::SAFETY,
            );
            prop_assert!(assessment.final_confidence >= 0.60 - 1e-9);
            prop_assert!(assessment.final_confidence <= 0.95 + 1e-9);
        }
    }
}
