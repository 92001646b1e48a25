//! Product priority index
//!
//! Ranks products for review by blending two min-max normalized components:
//!
//! - price risk: mean absolute (clamped) deviation over the product's scored
//!   records
//! - demand value: total value purchased
//!
//! A product without any scored record has no price-risk component, and so
//! no index.

use crate::deviation::PriceScores;
use crate::stats::min_max_scale;
use procura_data::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when computing priorities
#[derive(Debug, Error)]
pub enum PriorityError {
    /// Weights must be finite, non-negative, and not both zero
    #[error("Invalid priority weights: risk={risk}, demand={demand}")]
    InvalidWeights {
        /// Risk weight
        risk: f64,
        /// Demand weight
        demand: f64,
    },

    /// Price assessments do not line up with transactions
    #[error("Expected {expected} price assessments, got {actual}")]
    LengthMismatch {
        /// Number of transactions
        expected: usize,
        /// Number of assessments
        actual: usize,
    },
}

/// Configuration for the priority index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Weight of the normalized price-risk component
    pub risk_weight: f64,
    /// Weight of the normalized demand-value component
    pub demand_weight: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            risk_weight: 0.5,
            demand_weight: 0.5,
        }
    }
}

impl PriorityConfig {
    /// Check the weights.
    pub fn validate(&self) -> Result<(), PriorityError> {
        let (r, d) = (self.risk_weight, self.demand_weight);
        let valid = r.is_finite() && d.is_finite() && r >= 0.0 && d >= 0.0 && r + d > 0.0;
        if !valid {
            return Err(PriorityError::InvalidWeights { risk: r, demand: d });
        }
        Ok(())
    }
}

/// Priority of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPriority {
    /// Product key
    pub product_key: String,
    /// Records with a deviation score
    pub scored_records: usize,
    /// Mean |deviation| over scored records
    pub mean_abs_deviation: Option<f64>,
    /// Total positive value purchased
    pub demand_value: f64,
    /// Normalized price-risk component in [0, 1]
    pub risk_component: Option<f64>,
    /// Normalized demand component in [0, 1]
    pub demand_component: f64,
    /// Weighted blend in [0, 1]
    pub index: Option<f64>,
}

/// Priorities per product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityTable {
    entries: BTreeMap<String, ProductPriority>,
}

impl PriorityTable {
    /// Priority of a product.
    pub fn get(&self, product_key: &str) -> Option<&ProductPriority> {
        self.entries.get(product_key)
    }

    /// Index of a product, if defined.
    pub fn index(&self, product_key: &str) -> Option<f64> {
        self.entries.get(product_key).and_then(|p| p.index)
    }

    /// Entries in product-key order.
    pub fn iter(&self) -> impl Iterator<Item = &ProductPriority> {
        self.entries.values()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Products with an index, highest first. Ties keep product-key order.
    pub fn ranked(&self) -> Vec<&ProductPriority> {
        let mut ranked: Vec<&ProductPriority> =
            self.entries.values().filter(|p| p.index.is_some()).collect();
        ranked.sort_by(|a, b| {
            let (a, b) = (a.index.unwrap_or(0.0), b.index.unwrap_or(0.0));
            b.total_cmp(&a)
        });
        ranked
    }
}

#[derive(Default)]
struct ProductAccumulator {
    abs_deviation_sum: f64,
    scored: usize,
    value: f64,
}

/// Priority index calculator
#[derive(Debug, Clone, Default)]
pub struct PriorityIndexer {
    config: PriorityConfig,
}

impl PriorityIndexer {
    /// Create a new indexer, validating the weights.
    pub fn new(config: PriorityConfig) -> Result<Self, PriorityError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Indexer configuration.
    pub const fn config(&self) -> &PriorityConfig {
        &self.config
    }

    /// Compute priorities from transactions and their price assessments.
    pub fn compute(
        &self,
        transactions: &[Transaction],
        scores: &PriceScores,
    ) -> Result<PriorityTable, PriorityError> {
        if transactions.len() != scores.assessments.len() {
            return Err(PriorityError::LengthMismatch {
                expected: transactions.len(),
                actual: scores.assessments.len(),
            });
        }

        let mut products: BTreeMap<&str, ProductAccumulator> = BTreeMap::new();
        for (tx, assessment) in transactions.iter().zip(&scores.assessments) {
            let acc = products.entry(tx.product_key.as_str()).or_default();
            if tx.total_value.is_finite() && tx.total_value > 0.0 {
                acc.value += tx.total_value;
            }
            if let Some(deviation) = assessment.deviation() {
                acc.abs_deviation_sum += deviation.abs();
                acc.scored += 1;
            }
        }

        let mean_abs = |acc: &ProductAccumulator| {
            (acc.scored > 0).then(|| acc.abs_deviation_sum / acc.scored as f64)
        };
        let (risk_min, risk_max) = bounds(products.values().filter_map(mean_abs));
        let (value_min, value_max) = bounds(products.values().map(|acc| acc.value));
        let weight_sum = self.config.risk_weight + self.config.demand_weight;

        let entries: BTreeMap<String, ProductPriority> = products
            .iter()
            .map(|(&product, acc)| {
                let mean_abs_deviation = mean_abs(acc);
                let risk_component = mean_abs_deviation.map(|m| min_max_scale(m, risk_min, risk_max));
                let demand_component = min_max_scale(acc.value, value_min, value_max);
                let index = risk_component.map(|r| {
                    (self.config.risk_weight * r + self.config.demand_weight * demand_component)
                        / weight_sum
                });
                let priority = ProductPriority {
                    product_key: product.to_string(),
                    scored_records: acc.scored,
                    mean_abs_deviation,
                    demand_value: acc.value,
                    risk_component,
                    demand_component,
                    index,
                };
                (product.to_string(), priority)
            })
            .collect();

        tracing::debug!(
            products = entries.len(),
            indexed = entries.values().filter(|p| p.index.is_some()).count(),
            "priority index computed"
        );
        Ok(PriorityTable { entries })
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
