//! Bubble-risk aggregation and alert tiers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub fear_greed: f64,
    pub alt_season: f64,
    pub stablecoin: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fear_greed: 0.4,
            alt_season: 0.4,
            stablecoin: 0.2,
        }
    }
}

/// Inclusive lower bounds of the upper three tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertThresholds {
    pub extreme: f64,
    pub high: f64,
    pub neutral: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            extreme: 80.0,
            high: 65.0,
            neutral: 50.0,
        }
    }
}

/// Two-decimal rounding on the exact binary value, ties to even.
fn round2(x: f64) -> f64 {
    format!("{:.2}", x).parse().unwrap_or(x)
}

/// Weighted sum of the three inputs, rounded to two decimals.
///
/// Absent inputs drop out of the sum rather than being replaced by a
/// midpoint. The result is not clamped: inputs above 100 push the score
/// above 100.
pub fn compute_bubble_score(
    fear_greed: Option<f64>,
    alt_index: Option<f64>,
    stablecoin_ratio: Option<f64>,
    weights: &ScoreWeights,
) -> f64 {
    let mut score = 0.0;
    if let Some(fg) = fear_greed {
        score += fg * weights.fear_greed;
    }
    if let Some(alt) = alt_index {
        score += alt * weights.alt_season;
    }
    if let Some(sr) = stablecoin_ratio {
        score += (100.0 - sr) * weights.stablecoin;
    }
    round2(score)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Extreme,
    High,
    Neutral,
    Stable,
}

impl AlertLevel {
    /// Highest tier whose threshold the score reaches.
    pub fn from_score(score: f64, thresholds: &AlertThresholds) -> Self {
        if score >= thresholds.extreme {
            AlertLevel::Extreme
        } else if score >= thresholds.high {
            AlertLevel::High
        } else if score >= thresholds.neutral {
            AlertLevel::Neutral
        } else {
            AlertLevel::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertLevel::Extreme => "EXTREME RISK",
            AlertLevel::High => "HIGH RISK",
            AlertLevel::Neutral => "NEUTRAL / CAUTIOUS",
            AlertLevel::Stable => "STABLE / CALM",
        }
    }

    /// Label with the tier's emoji decoration.
    pub fn headline(&self) -> String {
        match self {
            AlertLevel::Extreme => format!("🚨 {} 🚨", self.label()),
            AlertLevel::High => format!("🔴 {}", self.label()),
            AlertLevel::Neutral => format!("🟠 {}", self.label()),
            AlertLevel::Stable => format!("🟢 {}", self.label()),
        }
    }

    /// Recommended action. The first line is the emphasised summary.
    pub fn action_lines(&self) -> [&'static str; 3] {
        match self {
            AlertLevel::Extreme => [
                "🛑 MARKET OVERHEATING!",
                "🔥 TAKE PROFITS NOW.",
                "⚡ EXPECT HIGH VOLATILITY.",
            ],
            AlertLevel::High => [
                "⚠️ MARKET RUNNING HOT.",
                "📈 TAKE PARTIAL PROFITS OR SET STOP-LOSS.",
                "👀 WATCH FOR REVERSALS.",
            ],
            AlertLevel::Neutral => [
                "😐 MIXED SENTIMENT.",
                "⏳ WAIT FOR CLEARER DIRECTION.",
                "📊 MONITOR KEY SUPPORT LEVELS.",
            ],
            AlertLevel::Stable => [
                "💤 LOW VOLATILITY.",
                "🪙 IDEAL FOR ACCUMULATION ON DIPS.",
                "📉 RISK REMAINS LOW.",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(fg: Option<f64>, alt: Option<f64>, sr: Option<f64>) -> f64 {
        compute_bubble_score(fg, alt, sr, &ScoreWeights::default())
    }

    #[test]
    fn test_weighted_sum() {
        assert_eq!(score(Some(50.0), Some(50.0), Some(50.0)), 50.0);
        assert_eq!(score(Some(72.0), Some(35.0), Some(6.0)), 61.6);
        assert_eq!(score(Some(100.0), Some(100.0), Some(0.0)), 100.0);
        assert_eq!(score(Some(0.0), Some(0.0), Some(100.0)), 0.0);
    }

    #[test]
    fn test_weighted_sum_over_grid() {
        for fg in (0..=100).step_by(10) {
            for alt in (0..=100).step_by(10) {
                for sr in (0..=100).step_by(10) {
                    let (fg, alt, sr) = (fg as f64, alt as f64, sr as f64);
                    let expected = round2(0.4 * fg + 0.4 * alt + 0.2 * (100.0 - sr));
                    assert_eq!(score(Some(fg), Some(alt), Some(sr)), expected);
                }
            }
        }
    }

    #[test]
    fn test_absent_inputs_contribute_zero() {
        assert_eq!(score(None, Some(50.0), Some(50.0)), 30.0);
        assert_eq!(score(Some(50.0), None, None), 20.0);
        assert_eq!(score(None, None, Some(0.0)), 20.0);
    }

    #[test]
    fn test_all_absent_is_zero() {
        assert_eq!(score(None, None, None), 0.0);
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        assert_eq!(score(Some(33.0), None, Some(93.37)), 14.53);
    }

    #[test]
    fn test_round2_exact_ties_go_to_even() {
        // 0.125 and 0.375 are exact in binary
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        // 1.005 is stored just below the tie
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(61.6), 61.6);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_score_not_clamped_above_100() {
        // A malformed alt-season source reporting 250 lifts the score past 100.
        assert_eq!(score(Some(100.0), Some(250.0), Some(0.0)), 160.0);
    }

    #[test]
    fn test_custom_weights() {
        let w = ScoreWeights {
            fear_greed: 1.0,
            alt_season: 0.0,
            stablecoin: 0.0,
        };
        assert_eq!(compute_bubble_score(Some(42.0), Some(99.0), Some(1.0), &w), 42.0);
    }

    #[test]
    fn test_threshold_boundaries_inclusive() {
        let t = AlertThresholds::default();
        assert_eq!(AlertLevel::from_score(80.0, &t), AlertLevel::Extreme);
        assert_eq!(AlertLevel::from_score(79.99, &t), AlertLevel::High);
        assert_eq!(AlertLevel::from_score(65.0, &t), AlertLevel::High);
        assert_eq!(AlertLevel::from_score(64.99, &t), AlertLevel::Neutral);
        assert_eq!(AlertLevel::from_score(50.0, &t), AlertLevel::Neutral);
        assert_eq!(AlertLevel::from_score(49.99, &t), AlertLevel::Stable);
        assert_eq!(AlertLevel::from_score(0.0, &t), AlertLevel::Stable);
        assert_eq!(AlertLevel::from_score(160.0, &t), AlertLevel::Extreme);
    }

    #[test]
    fn test_labels() {
        assert_eq!(AlertLevel::Extreme.label(), "EXTREME RISK");
        assert_eq!(AlertLevel::High.label(), "HIGH RISK");
        assert!(AlertLevel::Neutral.label().starts_with("NEUTRAL"));
        assert!(AlertLevel::Stable.label().starts_with("STABLE"));
        assert!(AlertLevel::Extreme.headline().contains("EXTREME RISK"));
    }
}
