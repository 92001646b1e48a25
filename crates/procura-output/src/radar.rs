//! Opportunity radar
//!
//! Per-record view of price paid against the benchmark, restricted to
//! scored records with a positive line value and quantity. The value gap is
//! signed: negative rows were bought below the benchmark.

use crate::records::TabularRecord;
use procura_risk::assemble::EnrichedTransaction;
use procura_risk::deviation::PriceAssessment;
use serde::{Deserialize, Serialize};

/// One radar row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarEntry {
    /// Record identifier
    pub id: String,
    /// Product key
    pub product_key: String,
    /// Region label
    pub region: String,
    /// Supplier label
    pub supplier: String,
    /// Purchase year
    pub year: i32,
    /// Unit price paid
    pub paid_price: f64,
    /// Benchmark price
    pub benchmark_price: f64,
    /// Gap as a fraction of the benchmark
    pub gap_fraction: f64,
    /// (paid - benchmark) * quantity
    pub value_gap: f64,
    /// Quantity
    pub quantity: u64,
    /// Price tier
    pub tier: String,
}

impl TabularRecord for RadarEntry {}

/// Radar rows in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityRadar {
    entries: Vec<RadarEntry>,
}

impl OpportunityRadar {
    /// Build the radar from enriched transactions.
    pub fn from_enriched(enriched: &[EnrichedTransaction]) -> Self {
        let entries: Vec<RadarEntry> = enriched
            .iter()
            .filter_map(|e| {
                let PriceAssessment::Scored(score) = &e.price else {
                    return None;
                };
                let tx = &e.transaction;
                let price = tx.scorable_price()?;
                if tx.quantity == 0 || !(tx.total_value > 0.0) {
                    return None;
                }
                Some(RadarEntry {
                    id: tx.id.clone(),
                    product_key: tx.product_key.clone(),
                    region: tx.region_key().label().to_string(),
                    supplier: tx.supplier_key().label().to_string(),
                    year: tx.year(),
                    paid_price: price,
                    benchmark_price: score.benchmark_price,
                    gap_fraction: score.relative_deviation,
                    value_gap: (price - score.benchmark_price) * tx.quantity as f64,
                    quantity: tx.quantity,
                    tier: score.tier.name().to_string(),
                })
            })
            .collect();

        tracing::debug!(
            rows = entries.len(),
            skipped = enriched.len() - entries.len(),
            "opportunity radar built"
        );
        Self { entries }
    }

    /// Radar rows.
    pub fn entries(&self) -> &[RadarEntry] {
        &self.entries
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the radar is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of positive value gaps.
    pub fn total_overspend(&self) -> f64 {
        self.entries.iter().map(|e| e.value_gap.max(0.0)).sum()
    }

    /// The `n` rows with the largest value gap.
    pub fn top(&self, n: usize) -> Vec<&RadarEntry> {
        let mut ranked: Vec<&RadarEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.value_gap.total_cmp(&a.value_gap));
        ranked.truncate(n);
        ranked
    }
}
