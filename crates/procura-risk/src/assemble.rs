//! Feature assembly
//!
//! Joins each transaction with the outputs of every analyzer. The result has
//! exactly one record per input transaction, in input order. Fields an
//! analyzer could not produce are `None` or an explicit unscored marker.

use crate::concentration::{ConcentrationFlag, ConcentrationTable};
use crate::demand::{DemandTable, DemandTier};
use crate::deviation::{PriceAssessment, PriceScores};
use crate::priority::PriorityTable;
use procura_data::Transaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while assembling features
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Price assessments do not line up with transactions
    #[error("Expected {expected} price assessments, got {actual}")]
    LengthMismatch {
        /// Number of transactions
        expected: usize,
        /// Number of assessments
        actual: usize,
    },
}

/// Concentration index and flag attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationMarker {
    /// Concentration index in (0, 1]
    pub index: f64,
    /// Risk flag
    pub flag: ConcentrationFlag,
}

/// A transaction with its derived features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTransaction {
    /// Source transaction
    pub transaction: Transaction,
    /// Price deviation score, or why there is none
    pub price: PriceAssessment,
    /// Demand stability tier of the product
    pub demand_tier: Option<DemandTier>,
    /// Supplier concentration of the transaction's aggregate
    pub concentration: Option<ConcentrationMarker>,
    /// Priority index of the product
    pub priority_index: Option<f64>,
}

/// Feature assembler
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Join transactions with analyzer outputs.
    pub fn assemble(
        &self,
        transactions: &[Transaction],
        prices: &PriceScores,
        demand: &DemandTable,
        concentration: &ConcentrationTable,
        priority: &PriorityTable,
    ) -> Result<Vec<EnrichedTransaction>, AssemblyError> {
        if transactions.len() != prices.assessments.len() {
            return Err(AssemblyError::LengthMismatch {
                expected: transactions.len(),
                actual: prices.assessments.len(),
            });
        }

        let enriched: Vec<EnrichedTransaction> = transactions
            .iter()
            .zip(&prices.assessments)
            .map(|(tx, price)| EnrichedTransaction {
                transaction: tx.clone(),
                price: price.clone(),
                demand_tier: demand.tier(&tx.product_key),
                concentration: concentration.lookup(tx).map(|c| ConcentrationMarker {
                    index: c.index,
                    flag: c.flag,
                }),
                priority_index: priority.index(&tx.product_key),
            })
            .collect();

        tracing::debug!(records = enriched.len(), "features assembled");
        Ok(enriched)
    }
}
