//! Demand stability analysis
//!
//! Builds a zero-filled quantity series per product over the analysis
//! horizon and classifies how regularly the product is bought:
//!
//! - zero fraction: share of horizon periods with no purchase
//! - coefficient of variation of the non-zero period quantities
//!
//! Products with no dated demand are `Inactive` and carry no metrics.

pub mod profile;

pub use profile::{
    DemandAnalyzer, DemandConfig, DemandLedger, DemandProfile, DemandSeries, DemandTable,
    DemandTier,
};

use thiserror::Error;

/// Errors that can occur when configuring demand analysis
#[derive(Debug, Error)]
pub enum DemandError {
    /// Zero-fraction thresholds must satisfy 0 < moderate <= high <= 1
    #[error("Invalid zero-fraction thresholds: moderate={moderate}, high={high}")]
    InvalidZeroFraction {
        /// Moderate boundary
        moderate: f64,
        /// High boundary
        high: f64,
    },

    /// Variability thresholds must satisfy 0 < moderate <= high
    #[error("Invalid variability thresholds: moderate={moderate}, high={high}")]
    InvalidVariability {
        /// Moderate boundary
        moderate: f64,
        /// High boundary
        high: f64,
    },
}
