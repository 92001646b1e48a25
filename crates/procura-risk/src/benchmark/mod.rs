//! Benchmark price estimation
//!
//! Computes a robust reference price (median) and dispersion per product and
//! time window. Groups with too few samples are invalid; transactions that
//! only map to invalid groups fall back to coarser groupings (category, then
//! description prefix) before being reported as unavailable.

pub mod estimate;
pub mod groups;

pub use estimate::{
    BenchmarkConfig, BenchmarkEstimator, BenchmarkSamples, BenchmarkWindow, DispersionMeasure,
    FallbackConfig,
};
pub use groups::{BenchmarkGroup, BenchmarkKey, BenchmarkTable, GroupLevel, WindowKey};

use thiserror::Error;

/// Errors that can occur during benchmark estimation
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// Minimum sample threshold must be at least one
    #[error("Invalid minimum sample threshold: {0} (must be at least 1)")]
    InvalidMinSamples(usize),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
