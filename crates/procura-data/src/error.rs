//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while reading canonical transaction tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// A required column is absent from the canonical table
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A required value is null in a given row
    #[error("Missing value for column {column} at row {row}")]
    MissingValue {
        /// Column name
        column: String,
        /// Zero-based row index
        row: usize,
    },

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid date value
    #[error("Invalid date at row {row}: {value}")]
    InvalidDate {
        /// Zero-based row index
        row: usize,
        /// Raw value that failed to parse
        value: String,
    },

    /// Negative quantity in a canonical record
    #[error("Negative quantity {quantity} at row {row}")]
    NegativeQuantity {
        /// Zero-based row index
        row: usize,
        /// Offending quantity
        quantity: i64,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
