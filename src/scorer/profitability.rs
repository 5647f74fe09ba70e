/// Payout (cents) at which the payout factor saturates.
const PAYOUT_SATURATION: f64 = 100_000.0;

/// 30-day revenue growth (cents) at which the growth factor saturates.
const GROWTH_SATURATION: f64 = 10_000.0;

/// The four values a profitability score is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub total_payout: i64,
    pub revenue_growth_30d: i64,
    pub retention_rate: f64,
    pub health: Option<f64>,
}

/// Turns a template's current standing into a single comparable number.
/// The trend calculator only supplies inputs and stores the result, so the
/// formula can be swapped without touching it.
pub trait ScoringPolicy {
    fn score(&self, inputs: &ScoreInputs) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub payout: f64,
    pub growth: f64,
    pub retention: f64,
    pub health: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            payout: 30.0,
            growth: 30.0,
            retention: 25.0,
            health: 15.0,
        }
    }
}

/// Default policy: each input normalized to 0..=1, then weighted.
/// With the default weights the score lands in 0..=100.
#[derive(Debug, Clone, Default)]
pub struct WeightedScore {
    pub weights: ScoreWeights,
}

impl WeightedScore {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

impl ScoringPolicy for WeightedScore {
    fn score(&self, inputs: &ScoreInputs) -> f64 {
        let payout = (inputs.total_payout.max(0) as f64 / PAYOUT_SATURATION).min(1.0);
        let growth = (inputs.revenue_growth_30d.max(0) as f64 / GROWTH_SATURATION).min(1.0);
        let retention = (inputs.retention_rate / 100.0).clamp(0.0, 1.0);
        let health = (inputs.health.unwrap_or(0.0) / 100.0).clamp(0.0, 1.0);

        let w = &self.weights;
        let score = payout * w.payout + growth * w.growth + retention * w.retention + health * w.health;
        super::ratios::round2(score.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(total_payout: i64, growth: i64, retention: f64, health: Option<f64>) -> ScoreInputs {
        ScoreInputs {
            total_payout,
            revenue_growth_30d: growth,
            retention_rate: retention,
            health,
        }
    }

    #[test]
    fn empty_template_scores_zero() {
        let policy = WeightedScore::default();
        assert_eq!(policy.score(&inputs(0, 0, 0.0, None)), 0.0);
    }

    #[test]
    fn saturated_inputs_score_weight_sum() {
        let policy = WeightedScore::default();
        let s = policy.score(&inputs(10_000_000, 1_000_000, 100.0, Some(100.0)));
        assert_eq!(s, 100.0);
    }

    #[test]
    fn negative_growth_does_not_subtract() {
        let policy = WeightedScore::default();
        let flat = policy.score(&inputs(50_000, 0, 50.0, Some(50.0)));
        let shrinking = policy.score(&inputs(50_000, -5_000, 50.0, Some(50.0)));
        assert_eq!(flat, shrinking);
    }

    #[test]
    fn custom_weights_are_respected() {
        let policy = WeightedScore::new(ScoreWeights {
            payout: 0.0,
            growth: 0.0,
            retention: 1.0,
            health: 0.0,
        });
        assert_eq!(policy.score(&inputs(99_999, 9_999, 40.0, Some(90.0))), 0.4);
    }
}
