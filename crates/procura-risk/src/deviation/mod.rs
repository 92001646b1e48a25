//! Price deviation scoring
//!
//! Scores each transaction against its resolved benchmark:
//!
//! deviation = (unit_price - benchmark) / dispersion
//!
//! The deviation is clamped before tiering so extreme outliers cannot
//! dominate downstream classification. Potential savings are the amount paid
//! above the benchmark, never negative.

pub mod scorer;

pub use scorer::{
    ClampPolicy, DeviationConfig, DeviationScorer, PriceAssessment, PriceScore, PriceScores,
    RiskTier, TierThresholds, UnscoredReason,
};

use thiserror::Error;

/// Errors that can occur when configuring deviation scoring
#[derive(Debug, Error)]
pub enum DeviationError {
    /// Tier thresholds must be positive and strictly ascending
    #[error("Invalid tier thresholds: attention={attention}, high={high}, critical={critical}")]
    InvalidThresholds {
        /// Attention boundary
        attention: f64,
        /// High boundary
        high: f64,
        /// Critical boundary
        critical: f64,
    },

    /// Clamp magnitude cannot reach the critical tier
    #[error("Invalid clamp magnitude: {magnitude} (must be finite and at least {critical})")]
    InvalidClamp {
        /// Configured magnitude
        magnitude: f64,
        /// Critical tier boundary
        critical: f64,
    },

    /// Winsorization percentile out of range
    #[error("Invalid winsorization percentile: {0} (must be in (0, 1])")]
    InvalidPercentile(f64),
}
