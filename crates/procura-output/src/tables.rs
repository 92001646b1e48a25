//! Engine tables as polars `DataFrame`s.
//!
//! Undefined values become nulls. Row order follows the source table:
//! input order for enriched transactions, key order for the auxiliary tables.

use crate::radar::OpportunityRadar;
use crate::records::{
    BenchmarkRecord, ConcentrationRecord, DemandRecord, EnrichedRecord, PriorityRecord,
};
use polars::prelude::*;
use procura_risk::assemble::EnrichedTransaction;
use procura_risk::benchmark::BenchmarkTable;
use procura_risk::concentration::ConcentrationTable;
use procura_risk::demand::DemandTable;
use procura_risk::priority::PriorityTable;

/// Enriched transactions, one row per input transaction.
pub fn enriched_frame(enriched: &[EnrichedTransaction]) -> PolarsResult<DataFrame> {
    let rows: Vec<EnrichedRecord> = enriched.iter().map(EnrichedRecord::from).collect();

    DataFrame::new(vec![
        Series::new("id".into(), rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()).into(),
        Series::new(
            "product_key".into(),
            rows.iter().map(|r| r.product_key.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "description".into(),
            rows.iter().map(|r| r.description.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "category".into(),
            rows.iter().map(|r| r.category.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "supplier".into(),
            rows.iter().map(|r| r.supplier.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "region".into(),
            rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "purchase_date".into(),
            rows.iter().map(|r| r.purchase_date.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()).into(),
        Series::new(
            "unit_price".into(),
            rows.iter().map(|r| r.unit_price).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "quantity".into(),
            rows.iter().map(|r| r.quantity).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "total_value".into(),
            rows.iter().map(|r| r.total_value).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "benchmark_key".into(),
            rows.iter().map(|r| r.benchmark_key.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "benchmark_price".into(),
            rows.iter().map(|r| r.benchmark_price).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "dispersion".into(),
            rows.iter().map(|r| r.dispersion).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "raw_deviation".into(),
            rows.iter().map(|r| r.raw_deviation).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "deviation".into(),
            rows.iter().map(|r| r.deviation).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "relative_deviation".into(),
            rows.iter().map(|r| r.relative_deviation).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "price_tier".into(),
            rows.iter().map(|r| r.price_tier.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "unscored_reason".into(),
            rows.iter().map(|r| r.unscored_reason.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "potential_savings".into(),
            rows.iter().map(|r| r.potential_savings).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "demand_tier".into(),
            rows.iter().map(|r| r.demand_tier.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "concentration_index".into(),
            rows.iter().map(|r| r.concentration_index).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "concentration_flag".into(),
            rows.iter().map(|r| r.concentration_flag.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "priority_index".into(),
            rows.iter().map(|r| r.priority_index).collect::<Vec<_>>(),
        )
        .into(),
    ])
}

/// Benchmark groups, valid and invalid.
pub fn benchmark_frame(table: &BenchmarkTable) -> PolarsResult<DataFrame> {
    let rows: Vec<BenchmarkRecord> = table.iter().map(BenchmarkRecord::from).collect();

    DataFrame::new(vec![
        Series::new("level".into(), rows.iter().map(|r| r.level.as_str()).collect::<Vec<_>>()).into(),
        Series::new("key".into(), rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>()).into(),
        Series::new("window".into(), rows.iter().map(|r| r.window.as_str()).collect::<Vec<_>>()).into(),
        Series::new(
            "sample_count".into(),
            rows.iter().map(|r| r.sample_count).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("median".into(), rows.iter().map(|r| r.median).collect::<Vec<_>>()).into(),
        Series::new(
            "dispersion".into(),
            rows.iter().map(|r| r.dispersion).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "raw_dispersion".into(),
            rows.iter().map(|r| r.raw_dispersion).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("valid".into(), rows.iter().map(|r| r.valid).collect::<Vec<_>>()).into(),
        Series::new(
            "floor_applied".into(),
            rows.iter().map(|r| r.floor_applied).collect::<Vec<_>>(),
        )
        .into(),
    ])
}

/// Demand profile per product.
pub fn demand_frame(table: &DemandTable) -> PolarsResult<DataFrame> {
    let rows: Vec<DemandRecord> = table.iter().map(DemandRecord::from).collect();

    DataFrame::new(vec![
        Series::new(
            "product_key".into(),
            rows.iter().map(|r| r.product_key.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "horizon_periods".into(),
            rows.iter().map(|r| r.horizon_periods).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "periods_with_demand".into(),
            rows.iter().map(|r| r.periods_with_demand).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "total_quantity".into(),
            rows.iter().map(|r| r.total_quantity).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "zero_fraction".into(),
            rows.iter().map(|r| r.zero_fraction).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("cv".into(), rows.iter().map(|r| r.cv).collect::<Vec<_>>()).into(),
        Series::new(
            "tier".into(),
            rows.iter().map(|r| r.tier.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
    ])
}

/// Supplier concentration per aggregate.
pub fn concentration_frame(table: &ConcentrationTable) -> PolarsResult<DataFrame> {
    let rows: Vec<ConcentrationRecord> = table.iter().map(ConcentrationRecord::from).collect();

    DataFrame::new(vec![
        Series::new(
            "product_key".into(),
            rows.iter().map(|r| r.product_key.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("region".into(), rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>()).into(),
        Series::new(
            "supplier_count".into(),
            rows.iter().map(|r| r.supplier_count).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("basis".into(), rows.iter().map(|r| r.basis.as_str()).collect::<Vec<_>>()).into(),
        Series::new(
            "total_value".into(),
            rows.iter().map(|r| r.total_value).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "top_supplier".into(),
            rows.iter().map(|r| r.top_supplier.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "top_share".into(),
            rows.iter().map(|r| r.top_share).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("index".into(), rows.iter().map(|r| r.index).collect::<Vec<_>>()).into(),
        Series::new("flag".into(), rows.iter().map(|r| r.flag.as_str()).collect::<Vec<_>>()).into(),
    ])
}

/// Priority per product.
pub fn priority_frame(table: &PriorityTable) -> PolarsResult<DataFrame> {
    let rows: Vec<PriorityRecord> = table.iter().map(PriorityRecord::from).collect();

    DataFrame::new(vec![
        Series::new(
            "product_key".into(),
            rows.iter().map(|r| r.product_key.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "scored_records".into(),
            rows.iter().map(|r| r.scored_records).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "mean_abs_deviation".into(),
            rows.iter().map(|r| r.mean_abs_deviation).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "demand_value".into(),
            rows.iter().map(|r| r.demand_value).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "risk_component".into(),
            rows.iter().map(|r| r.risk_component).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "demand_component".into(),
            rows.iter().map(|r| r.demand_component).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("index".into(), rows.iter().map(|r| r.index).collect::<Vec<_>>()).into(),
    ])
}

/// Opportunity radar rows.
pub fn radar_frame(radar: &OpportunityRadar) -> PolarsResult<DataFrame> {
    let rows = radar.entries();

    DataFrame::new(vec![
        Series::new("id".into(), rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()).into(),
        Series::new(
            "product_key".into(),
            rows.iter().map(|r| r.product_key.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("region".into(), rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>()).into(),
        Series::new(
            "supplier".into(),
            rows.iter().map(|r| r.supplier.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()).into(),
        Series::new(
            "paid_price".into(),
            rows.iter().map(|r| r.paid_price).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "benchmark_price".into(),
            rows.iter().map(|r| r.benchmark_price).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "gap_fraction".into(),
            rows.iter().map(|r| r.gap_fraction).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "value_gap".into(),
            rows.iter().map(|r| r.value_gap).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "quantity".into(),
            rows.iter().map(|r| r.quantity).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("tier".into(), rows.iter().map(|r| r.tier.as_str()).collect::<Vec<_>>()).into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_data::Transaction;
    use procura_risk::benchmark::{BenchmarkConfig, BenchmarkEstimator};
    use procura_risk::demand::DemandAnalyzer;

    #[test]
    fn test_benchmark_frame_nulls_for_invalid_groups() {
        let txs = vec![
            Transaction::new("1", "P", "ITEM", 2021).with_price(10.0, 1),
            Transaction::new("2", "Q", "OTHER", 2021).with_price(4.0, 1),
            Transaction::new("3", "P", "ITEM", 2021).with_price(12.0, 1),
        ];
        let table = BenchmarkEstimator::new(BenchmarkConfig {
            min_samples: 2,
            ..Default::default()
        })
        .unwrap()
        .estimate(&txs);
        let df = benchmark_frame(&table).unwrap();

        assert_eq!(df.height(), table.len());
        let valid = df.column("valid").unwrap().bool().unwrap();
        let median = df.column("median").unwrap().f64().unwrap();
        for i in 0..df.height() {
            assert_eq!(valid.get(i) == Some(true), median.get(i).is_some());
        }
    }

    #[test]
    fn test_demand_frame_shape() {
        let txs = vec![
            Transaction::new("1", "P", "ITEM", 2021).with_price(1.0, 3),
            Transaction::new("2", "Q", "ITEM", 2021).with_price(1.0, 0),
        ];
        let df = demand_frame(&DemandAnalyzer::default().analyze(&txs)).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 7);
        // P was bought but never dated; Q was never bought.
        let tier = df.column("tier").unwrap().str().unwrap();
        assert_eq!(tier.get(0), None);
        assert_eq!(tier.get(1), Some("Inactive"));
        let total = df.column("total_quantity").unwrap().u64().unwrap();
        assert_eq!(total.get(0), Some(3));
    }
}
