//! Error type aggregating every analyzer's errors.

use crate::assemble::AssemblyError;
use crate::benchmark::BenchmarkError;
use crate::concentration::ConcentrationError;
use crate::demand::DemandError;
use crate::deviation::DeviationError;
use crate::priority::PriorityError;
use thiserror::Error;

/// Result alias for risk analysis.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors raised by the risk analyzers
#[derive(Debug, Error)]
pub enum RiskError {
    /// Benchmark estimation error
    #[error("Benchmark error: {0}")]
    Benchmark(#[from] BenchmarkError),

    /// Deviation scoring error
    #[error("Deviation error: {0}")]
    Deviation(#[from] DeviationError),

    /// Demand analysis error
    #[error("Demand error: {0}")]
    Demand(#[from] DemandError),

    /// Concentration analysis error
    #[error("Concentration error: {0}")]
    Concentration(#[from] ConcentrationError),

    /// Priority index error
    #[error("Priority error: {0}")]
    Priority(#[from] PriorityError),

    /// Feature assembly error
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),
}
