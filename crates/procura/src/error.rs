//! Engine errors.

use procura_data::DataError;
use procura_risk::RiskError;
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the feature engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was given no transactions
    #[error("Empty transaction set")]
    EmptyTransactionSet,

    /// Invalid partitioning request
    #[error("Invalid partitioning: {0}")]
    InvalidPartitioning(String),

    /// Analyzer configuration or assembly error
    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    /// Input adapter error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Configuration parse error
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
