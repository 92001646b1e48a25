//! Flat, serializable rows for the engine's tables.
//!
//! Each record mirrors one row of an output table. Undefined values stay
//! `None` and serialize as empty CSV fields or JSON `null`.

use procura_data::Transaction;
use procura_risk::assemble::EnrichedTransaction;
use procura_risk::benchmark::BenchmarkGroup;
use procura_risk::concentration::SupplierConcentration;
use procura_risk::demand::DemandProfile;
use procura_risk::deviation::PriceAssessment;
use procura_risk::priority::ProductPriority;
use serde::{Deserialize, Serialize};

/// Marker for row types that can be written as a table.
pub trait TabularRecord: Serialize {}

/// One enriched transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// Record identifier
    pub id: String,
    /// Product key
    pub product_key: String,
    /// Product description
    pub description: String,
    /// Product category
    pub category: Option<String>,
    /// Supplier label (`<unknown>` when missing)
    pub supplier: String,
    /// Region label (`<unknown>` when missing)
    pub region: String,
    /// Purchase date, `YYYY-MM-DD`
    pub purchase_date: Option<String>,
    /// Purchase year
    pub year: i32,
    /// Unit price paid
    pub unit_price: Option<f64>,
    /// Quantity
    pub quantity: u64,
    /// Line total value
    pub total_value: f64,
    /// Benchmark group the price was scored against
    pub benchmark_key: Option<String>,
    /// Benchmark (median) price
    pub benchmark_price: Option<f64>,
    /// Floored dispersion
    pub dispersion: Option<f64>,
    /// Unclamped deviation
    pub raw_deviation: Option<f64>,
    /// Clamped deviation
    pub deviation: Option<f64>,
    /// Relative gap to the benchmark
    pub relative_deviation: Option<f64>,
    /// Price tier label, or `Unscored`
    pub price_tier: String,
    /// Why the record is unscored
    pub unscored_reason: Option<String>,
    /// Potential savings
    pub potential_savings: Option<f64>,
    /// Demand tier of the product
    pub demand_tier: Option<String>,
    /// Supplier concentration index
    pub concentration_index: Option<f64>,
    /// Supplier concentration flag
    pub concentration_flag: Option<String>,
    /// Product priority index
    pub priority_index: Option<f64>,
}

impl From<&EnrichedTransaction> for EnrichedRecord {
    fn from(e: &EnrichedTransaction) -> Self {
        let tx: &Transaction = &e.transaction;
        let (score, unscored_reason) = match &e.price {
            PriceAssessment::Scored(score) => (Some(score), None),
            PriceAssessment::Unscored(reason) => (None, Some(reason.name().to_string())),
        };

        Self {
            id: tx.id.clone(),
            product_key: tx.product_key.clone(),
            description: tx.description.clone(),
            category: tx.category.clone(),
            supplier: tx.supplier_key().label().to_string(),
            region: tx.region_key().label().to_string(),
            purchase_date: tx.purchase_date.map(|d| d.to_string()),
            year: tx.year(),
            unit_price: tx.unit_price,
            quantity: tx.quantity,
            total_value: tx.total_value,
            benchmark_key: score.map(|s| s.benchmark_key.to_string()),
            benchmark_price: score.map(|s| s.benchmark_price),
            dispersion: score.map(|s| s.dispersion),
            raw_deviation: score.map(|s| s.raw_deviation),
            deviation: score.map(|s| s.deviation),
            relative_deviation: score.map(|s| s.relative_deviation),
            price_tier: e.price.label().to_string(),
            unscored_reason,
            potential_savings: score.map(|s| s.potential_savings),
            demand_tier: e.demand_tier.map(|t| t.name().to_string()),
            concentration_index: e.concentration.map(|c| c.index),
            concentration_flag: e.concentration.map(|c| c.flag.name().to_string()),
            priority_index: e.priority_index,
        }
    }
}

impl TabularRecord for EnrichedRecord {}

/// One benchmark group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Grouping level
    pub level: String,
    /// Group value
    pub key: String,
    /// Time window
    pub window: String,
    /// Number of price samples
    pub sample_count: u64,
    /// Median price
    pub median: Option<f64>,
    /// Floored dispersion
    pub dispersion: Option<f64>,
    /// Measured dispersion
    pub raw_dispersion: Option<f64>,
    /// Whether the group met the sample threshold
    pub valid: bool,
    /// Whether the floor replaced the measured dispersion
    pub floor_applied: bool,
}

impl From<&BenchmarkGroup> for BenchmarkRecord {
    fn from(g: &BenchmarkGroup) -> Self {
        Self {
            level: g.key.level.name().to_string(),
            key: g.key.key.clone(),
            window: g.key.window.to_string(),
            sample_count: g.sample_count as u64,
            median: g.median,
            dispersion: g.dispersion,
            raw_dispersion: g.raw_dispersion,
            valid: g.valid,
            floor_applied: g.floor_applied(),
        }
    }
}

impl TabularRecord for BenchmarkRecord {}

/// Demand profile of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    /// Product key
    pub product_key: String,
    /// Periods in the horizon
    pub horizon_periods: u64,
    /// Periods with demand
    pub periods_with_demand: u64,
    /// Total quantity
    pub total_quantity: u64,
    /// Zero-period fraction
    pub zero_fraction: Option<f64>,
    /// Coefficient of variation
    pub cv: Option<f64>,
    /// Demand tier (empty when no purchase is dated)
    pub tier: Option<String>,
}

impl From<&DemandProfile> for DemandRecord {
    fn from(p: &DemandProfile) -> Self {
        Self {
            product_key: p.product_key.clone(),
            horizon_periods: p.horizon_periods as u64,
            periods_with_demand: p.periods_with_demand as u64,
            total_quantity: p.total_quantity,
            zero_fraction: p.zero_fraction,
            cv: p.cv,
            tier: p.tier.map(|t| t.name().to_string()),
        }
    }
}

impl TabularRecord for DemandRecord {}

/// Supplier concentration of one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationRecord {
    /// Product key
    pub product_key: String,
    /// Region label, `all` for the global scope
    pub region: String,
    /// Distinct suppliers
    pub supplier_count: u64,
    /// Share basis
    pub basis: String,
    /// Positive purchased value
    pub total_value: f64,
    /// Largest supplier
    pub top_supplier: String,
    /// Largest share
    pub top_share: f64,
    /// Concentration index
    pub index: f64,
    /// Risk flag
    pub flag: String,
}

impl From<&SupplierConcentration> for ConcentrationRecord {
    fn from(c: &SupplierConcentration) -> Self {
        Self {
            product_key: c.key.product_key.clone(),
            region: c.key.region_label().to_string(),
            supplier_count: c.supplier_count as u64,
            basis: c.basis.name().to_string(),
            total_value: c.total_value,
            top_supplier: c.top_supplier.label().to_string(),
            top_share: c.top_share,
            index: c.index,
            flag: c.flag.name().to_string(),
        }
    }
}

impl TabularRecord for ConcentrationRecord {}

/// Priority of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRecord {
    /// Product key
    pub product_key: String,
    /// Scored records
    pub scored_records: u64,
    /// Mean |deviation|
    pub mean_abs_deviation: Option<f64>,
    /// Purchased value
    pub demand_value: f64,
    /// Normalized price-risk component
    pub risk_component: Option<f64>,
    /// Normalized demand component
    pub demand_component: f64,
    /// Priority index
    pub index: Option<f64>,
}

impl From<&ProductPriority> for PriorityRecord {
    fn from(p: &ProductPriority) -> Self {
        Self {
            product_key: p.product_key.clone(),
            scored_records: p.scored_records as u64,
            mean_abs_deviation: p.mean_abs_deviation,
            demand_value: p.demand_value,
            risk_component: p.risk_component,
            demand_component: p.demand_component,
            index: p.index,
        }
    }
}

impl TabularRecord for PriorityRecord {}
