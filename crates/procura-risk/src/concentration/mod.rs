//! Supplier concentration analysis
//!
//! Aggregates purchased value per supplier for each (product, region) pair,
//! or per product under the global scope, and measures how concentrated the
//! supply is. Two index formulas are available:
//!
//! - max share: the largest supplier's fraction of the total
//! - Herfindahl: sum of squared supplier shares
//!
//! Both lie in (0, 1]. A pair served by a single supplier is always flagged
//! as sole-supplier risk, whatever the configured threshold.

pub mod index;

pub use index::{
    ConcentrationAnalyzer, ConcentrationConfig, ConcentrationFlag, ConcentrationFormula,
    ConcentrationKey, ConcentrationScope, ConcentrationTable, ShareBasis, SupplierConcentration,
    SupplierLedger,
};

use thiserror::Error;

/// Errors that can occur when configuring concentration analysis
#[derive(Debug, Error)]
pub enum ConcentrationError {
    /// Threshold outside (0, 1]
    #[error("Invalid concentration threshold: {0} (must be in (0, 1])")]
    InvalidThreshold(f64),
}
