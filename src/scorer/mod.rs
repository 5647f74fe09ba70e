pub mod profitability;
pub mod ratios;
pub mod trend;

pub use profitability::{ScoreWeights, ScoringPolicy, WeightedScore};
pub use trend::TrendCalculator;
