//! Deviation scorer and risk tiers.

use super::DeviationError;
use crate::benchmark::{BenchmarkGroup, BenchmarkKey, BenchmarkTable};
use crate::stats::percentile;
use procura_data::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered price risk tier of a scored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    /// Within normal variation
    Normal,
    /// Worth a look
    Attention,
    /// Clearly off-benchmark
    High,
    /// At or beyond the critical boundary
    Critical,
}

impl RiskTier {
    /// All tiers, lowest first.
    pub const fn all() -> [Self; 4] {
        [Self::Normal, Self::Attention, Self::High, Self::Critical]
    }

    /// Tier label.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Attention => "Attention",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Absolute deviation boundaries between tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Lower bound of `Attention`
    pub attention: f64,
    /// Lower bound of `High`
    pub high: f64,
    /// Lower bound of `Critical`
    pub critical: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            attention: 2.0,
            high: 4.0,
            critical: 6.0,
        }
    }
}

impl TierThresholds {
    /// Tier for a (clamped) deviation.
    pub fn classify(&self, deviation: f64) -> RiskTier {
        let magnitude = deviation.abs();
        if magnitude >= self.critical {
            RiskTier::Critical
        } else if magnitude >= self.high {
            RiskTier::High
        } else if magnitude >= self.attention {
            RiskTier::Attention
        } else {
            RiskTier::Normal
        }
    }

    fn validate(&self) -> Result<(), DeviationError> {
        let ordered = self.attention > 0.0 && self.attention < self.high && self.high < self.critical;
        if !(ordered && self.critical.is_finite()) {
            return Err(DeviationError::InvalidThresholds {
                attention: self.attention,
                high: self.high,
                critical: self.critical,
            });
        }
        Ok(())
    }
}

/// How the deviation clamp magnitude is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ClampPolicy {
    /// Fixed magnitude
    Static {
        /// Clamp bound
        magnitude: f64,
    },
    /// Magnitude recomputed each run from the distribution of absolute raw
    /// deviations, never below `min_magnitude`
    Winsorized {
        /// Percentile of |raw deviation| used as the bound (fraction in (0, 1])
        percentile: f64,
        /// Lower bound on the recomputed magnitude
        min_magnitude: f64,
    },
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self::Static { magnitude: 6.0 }
    }
}

/// Configuration for deviation scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviationConfig {
    /// Clamp policy
    pub clamp: ClampPolicy,
    /// Tier boundaries
    pub thresholds: TierThresholds,
}

impl DeviationConfig {
    /// Check thresholds and clamp policy.
    pub fn validate(&self) -> Result<(), DeviationError> {
        self.thresholds.validate()?;
        let critical = self.thresholds.critical;
        let magnitude = match self.clamp {
            ClampPolicy::Static { magnitude } => magnitude,
            ClampPolicy::Winsorized {
                percentile,
                min_magnitude,
            } => {
                if !(percentile > 0.0 && percentile <= 1.0) {
                    return Err(DeviationError::InvalidPercentile(percentile));
                }
                min_magnitude
            }
        };
        if !(magnitude.is_finite() && magnitude >= critical) {
            return Err(DeviationError::InvalidClamp {
                magnitude,
                critical,
            });
        }
        Ok(())
    }
}

/// Why a transaction carries no deviation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnscoredReason {
    /// Unit price missing, zero, negative or not finite
    MissingPrice,
    /// No valid benchmark at any grouping level
    BenchmarkUnavailable,
}

impl UnscoredReason {
    /// Label for tables.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MissingPrice => "missing_price",
            Self::BenchmarkUnavailable => "benchmark_unavailable",
        }
    }
}

/// Score of a transaction with a resolved benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceScore {
    /// Group that supplied the benchmark
    pub benchmark_key: BenchmarkKey,
    /// Benchmark (median) price
    pub benchmark_price: f64,
    /// Floored dispersion used as the denominator
    pub dispersion: f64,
    /// Unclamped deviation
    pub raw_deviation: f64,
    /// Deviation after clamping
    pub deviation: f64,
    /// (unit_price - benchmark) / benchmark
    pub relative_deviation: f64,
    /// Risk tier of the clamped deviation
    pub tier: RiskTier,
    /// max(0, unit_price - benchmark) * quantity
    pub potential_savings: f64,
}

/// Outcome of scoring one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PriceAssessment {
    /// Scored against a valid benchmark
    Scored(PriceScore),
    /// Not scorable
    Unscored(UnscoredReason),
}

impl PriceAssessment {
    /// Clamped deviation, if scored.
    pub const fn deviation(&self) -> Option<f64> {
        match self {
            Self::Scored(score) => Some(score.deviation),
            Self::Unscored(_) => None,
        }
    }

    /// Risk tier, if scored.
    pub const fn tier(&self) -> Option<RiskTier> {
        match self {
            Self::Scored(score) => Some(score.tier),
            Self::Unscored(_) => None,
        }
    }

    /// Potential savings, if scored.
    pub const fn potential_savings(&self) -> Option<f64> {
        match self {
            Self::Scored(score) => Some(score.potential_savings),
            Self::Unscored(_) => None,
        }
    }

    /// Tier label, or `"Unscored"`.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scored(score) => score.tier.name(),
            Self::Unscored(_) => "Unscored",
        }
    }

    /// Whether a score is present.
    pub const fn is_scored(&self) -> bool {
        matches!(self, Self::Scored(_))
    }
}

/// Assessments for a transaction slice, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceScores {
    /// One assessment per transaction
    pub assessments: Vec<PriceAssessment>,
    /// Clamp magnitude in effect for this run
    pub clamp_magnitude: f64,
}

impl PriceScores {
    /// Number of scored transactions.
    pub fn scored_count(&self) -> usize {
        self.assessments.iter().filter(|a| a.is_scored()).count()
    }

    /// Number of unscored transactions.
    pub fn unscored_count(&self) -> usize {
        self.assessments.len() - self.scored_count()
    }
}

/// Deviation scorer
#[derive(Debug, Clone, Default)]
pub struct DeviationScorer {
    config: DeviationConfig,
}

impl DeviationScorer {
    /// Create a new scorer, validating the configuration.
    pub fn new(config: DeviationConfig) -> Result<Self, DeviationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Scorer configuration.
    pub const fn config(&self) -> &DeviationConfig {
        &self.config
    }

    /// Score every transaction against the benchmark table.
    pub fn score(&self, transactions: &[Transaction], benchmarks: &BenchmarkTable) -> PriceScores {
        let resolved: Vec<Result<(&BenchmarkGroup, f64, f64, f64), UnscoredReason>> = transactions
            .iter()
            .map(|tx| {
                let price = tx.scorable_price().ok_or(UnscoredReason::MissingPrice)?;
                let group = benchmarks
                    .resolve(tx)
                    .ok_or(UnscoredReason::BenchmarkUnavailable)?;
                let (benchmark, dispersion) = group
                    .benchmark()
                    .ok_or(UnscoredReason::BenchmarkUnavailable)?;
                Ok((group, price, benchmark, dispersion))
            })
            .collect();

        let clamp_magnitude = self.clamp_magnitude(&resolved);

        let assessments: Vec<PriceAssessment> = transactions
            .iter()
            .zip(resolved)
            .map(|(tx, resolved)| match resolved {
                Ok((group, price, benchmark, dispersion)) => {
                    let raw_deviation = (price - benchmark) / dispersion;
                    let deviation = raw_deviation.clamp(-clamp_magnitude, clamp_magnitude);
                    PriceAssessment::Scored(PriceScore {
                        benchmark_key: group.key.clone(),
                        benchmark_price: benchmark,
                        dispersion,
                        raw_deviation,
                        deviation,
                        relative_deviation: (price - benchmark) / benchmark,
                        tier: self.config.thresholds.classify(deviation),
                        potential_savings: (price - benchmark).max(0.0) * tx.quantity as f64,
                    })
                }
                Err(reason) => PriceAssessment::Unscored(reason),
            })
            .collect();

        let scores = PriceScores {
            assessments,
            clamp_magnitude,
        };
        tracing::debug!(
            scored = scores.scored_count(),
            unscored = scores.unscored_count(),
            clamp = clamp_magnitude,
            "price deviations scored"
        );
        scores
    }

    fn clamp_magnitude(
        &self,
        resolved: &[Result<(&BenchmarkGroup, f64, f64, f64), UnscoredReason>],
    ) -> f64 {
        match self.config.clamp {
            ClampPolicy::Static { magnitude } => magnitude,
            ClampPolicy::Winsorized {
                percentile: q,
                min_magnitude,
            } => {
                let magnitudes: Vec<f64> = resolved
                    .iter()
                    .flatten()
                    .map(|(_, price, benchmark, dispersion)| ((price - benchmark) / dispersion).abs())
                    .collect();
                percentile(&magnitudes, q).map_or(min_magnitude, |p| p.max(min_magnitude))
            }
        }
    }
}
