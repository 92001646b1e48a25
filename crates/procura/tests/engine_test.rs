//! End-to-end tests for the feature engine.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use procura::data::Transaction;
use procura::risk::benchmark::BenchmarkConfig;
use procura::risk::{ConcentrationFlag, DemandTier, PriceAssessment, RiskTier};
use procura::{EngineConfig, EngineError, FeatureEngine, Partitioning};
use rstest::rstest;

fn purchase(
    id: &str,
    product: &str,
    description: &str,
    date: (i32, u32),
    price: f64,
    quantity: u64,
    supplier: &str,
    region: &str,
) -> Transaction {
    let (year, month) = date;
    Transaction::new(id, product, description, year)
        .with_price(price, quantity)
        .with_supplier(supplier)
        .with_region(region)
        .with_date(NaiveDate::from_ymd_opt(year, month, 10).unwrap())
}

/// Two years of purchases over four products and two regions.
fn workload() -> Vec<Transaction> {
    let mut txs = Vec::new();
    let mut id = 0;
    let mut next_id = || {
        id += 1;
        id.to_string()
    };

    // Steady monthly demand, mostly from one supplier.
    for year in [2021, 2022] {
        for month in 1..=12 {
            let supplier = if month % 4 == 0 { "BETA" } else { "ACME" };
            let price = if month == 7 { 31.0 } else { 10.0 + (month % 3) as f64 * 0.5 };
            txs.push(purchase(
                &next_id(),
                "DIP500",
                "DIPIRONA 500MG",
                (year, month),
                price,
                100,
                supplier,
                "SP",
            ));
        }
    }
    // Sporadic demand, single supplier, two regions.
    for (year, month, region) in [(2021, 3, "SP"), (2021, 11, "RJ"), (2022, 6, "SP"), (2022, 9, "SP")] {
        txs.push(purchase(
            &next_id(),
            "AMOX250",
            "AMOXICILINA 250MG",
            (year, month),
            4.0 + month as f64 * 0.1,
            40,
            "GAMA",
            region,
        ));
    }
    // A lone record that cannot reach a valid benchmark.
    txs.push(purchase(
        &next_id(),
        "SERINGA10",
        "SERINGA 10ML",
        (2022, 2),
        0.8,
        1000,
        "DELTA",
        "RJ",
    ));
    // Registered but never delivered.
    txs.push(
        Transaction::new(next_id(), "LUVA", "LUVA PROCEDIMENTO", 2022)
            .with_supplier("DELTA")
            .with_region("RJ")
            .with_date(NaiveDate::from_ymd_opt(2022, 4, 1).unwrap()),
    );
    txs
}

fn engine() -> FeatureEngine {
    FeatureEngine::new(EngineConfig::default()).unwrap()
}

#[test]
fn test_outlier_is_scored_against_median() {
    let txs = vec![
        purchase("1", "P", "PRODUCT P", (2022, 1), 100.0, 10, "A", "SP"),
        purchase("2", "P", "PRODUCT P", (2022, 2), 100.0, 10, "A", "SP"),
        purchase("3", "P", "PRODUCT P", (2022, 3), 400.0, 10, "B", "SP"),
    ];
    let mut config = EngineConfig::default();
    config.benchmark = BenchmarkConfig {
        min_samples: 2,
        ..Default::default()
    };
    let output = FeatureEngine::new(config).unwrap().run(&txs).unwrap();

    let PriceAssessment::Scored(outlier) = &output.enriched[2].price else {
        panic!("outlier should be scored");
    };
    assert_eq!(outlier.benchmark_price, 100.0);
    assert!(outlier.raw_deviation > 6.0);
    assert_eq!(outlier.deviation, 6.0);
    assert_eq!(outlier.tier, RiskTier::Critical);
    assert_relative_eq!(outlier.potential_savings, 3000.0);
    assert_relative_eq!(outlier.relative_deviation, 3.0);

    for record in &output.enriched[..2] {
        assert_eq!(record.price.tier(), Some(RiskTier::Normal));
        assert_eq!(record.price.potential_savings(), Some(0.0));
    }
}

#[test]
fn test_lone_sample_is_unscored_not_dropped() {
    let txs = vec![purchase("1", "X", "ITEM X", (2022, 1), 5.0, 1, "A", "SP")];
    let output = engine().run(&txs).unwrap();

    assert_eq!(output.enriched.len(), 1);
    assert!(!output.enriched[0].price.is_scored());
    assert_eq!(output.enriched[0].price.label(), "Unscored");
    assert_eq!(output.enriched[0].priority_index, None);
    assert_eq!(output.tables.benchmarks.valid_count(), 0);
}

#[test]
fn test_every_record_is_enriched_in_order() {
    let txs = workload();
    let output = engine().run(&txs).unwrap();

    assert_eq!(output.enriched.len(), txs.len());
    for (record, tx) in output.enriched.iter().zip(&txs) {
        assert_eq!(&record.transaction, tx);
        // Exactly one of a score or an unscored marker.
        assert_ne!(
            record.price.is_scored(),
            matches!(record.price, PriceAssessment::Unscored(_))
        );
        assert!(record.demand_tier.is_some());
        assert!(record.concentration.is_some());
    }
    assert_eq!(output.summary().records, txs.len());
}

#[test]
fn test_feature_invariants() {
    let output = engine().run(&workload()).unwrap();

    for record in &output.enriched {
        if let PriceAssessment::Scored(score) = &record.price {
            assert!(score.potential_savings >= 0.0);
            assert!(score.deviation.abs() <= output.tables.prices.clamp_magnitude);
            assert!(score.dispersion > 0.0);
        }
        if let Some(index) = record.priority_index {
            assert!((0.0..=1.0).contains(&index));
        }
        if let Some(marker) = record.concentration {
            assert!(marker.index > 0.0 && marker.index <= 1.0);
        }
    }

    let benchmarks = &output.tables.benchmarks;
    let config = benchmarks.config();
    assert!(benchmarks.valid_count() > 0);
    for group in benchmarks.iter() {
        if group.valid {
            assert!(group.sample_count >= config.min_samples);
            let median = group.median.unwrap();
            let dispersion = group.dispersion.unwrap();
            assert!(dispersion >= config.dispersion_floor(median));
            assert!(dispersion > 0.0);
        } else {
            assert!(group.sample_count < config.min_samples);
            assert_eq!(group.median, None);
            assert_eq!(group.dispersion, None);
        }
    }
}

#[test]
fn test_demand_tiers() {
    let output = engine().run(&workload()).unwrap();
    let demand = &output.tables.demand;

    assert_eq!(demand.tier("DIP500"), Some(DemandTier::Stable));
    assert_eq!(demand.tier("AMOX250"), Some(DemandTier::Intermittent));
    assert_eq!(demand.tier("LUVA"), Some(DemandTier::Inactive));
    assert_eq!(demand.get("LUVA").unwrap().cv, None);
    assert_eq!(demand.horizon.unwrap().len(), 24);
}

#[test]
fn test_undated_purchase_has_no_demand_tier() {
    let mut txs = workload();
    txs.push(
        Transaction::new("undated", "GAZE", "GAZE ESTERIL", 2022)
            .with_price(1.5, 200)
            .with_supplier("DELTA")
            .with_region("RJ"),
    );
    let output = engine().run(&txs).unwrap();

    let gaze = output.tables.demand.get("GAZE").unwrap();
    assert_eq!(gaze.tier, None);
    assert_eq!(gaze.total_quantity, 200);
    assert_eq!(output.enriched.last().unwrap().demand_tier, None);
    // Other products keep their tiers.
    assert_eq!(output.tables.demand.tier("LUVA"), Some(DemandTier::Inactive));
}

#[test]
fn test_concentration_flags() {
    let output = engine().run(&workload()).unwrap();

    let dipirona = output.enriched.iter().find(|r| r.transaction.product_key == "DIP500");
    let marker = dipirona.unwrap().concentration.unwrap();
    // Three of every four months go to ACME at similar prices.
    assert!(marker.index > 0.7 && marker.index < 0.8);
    assert_eq!(marker.flag, ConcentrationFlag::Diversified);

    for record in output
        .enriched
        .iter()
        .filter(|r| r.transaction.product_key == "AMOX250")
    {
        assert_eq!(
            record.concentration.unwrap().flag,
            ConcentrationFlag::SoleSupplier
        );
    }
}

#[test]
fn test_high_concentration_split() {
    let txs = vec![
        purchase("1", "P", "PRODUCT P", (2022, 1), 90.0, 10, "A", "SP"),
        purchase("2", "P", "PRODUCT P", (2022, 2), 10.0, 10, "B", "SP"),
    ];
    let output = engine().run(&txs).unwrap();
    for record in &output.enriched {
        let marker = record.concentration.unwrap();
        assert_relative_eq!(marker.index, 0.9);
        assert_eq!(marker.flag, ConcentrationFlag::High);
    }
}

#[test]
fn test_runs_are_deterministic() {
    let txs = workload();
    let engine = engine();
    let first = engine.run(&txs).unwrap();
    let second = engine.run(&txs).unwrap();

    assert_eq!(first.enriched, second.enriched);
    assert_eq!(first.tables.benchmarks, second.tables.benchmarks);
    assert_eq!(first.tables.priority, second.tables.priority);
}

#[rstest]
#[case(Partitioning::Year)]
#[case(Partitioning::ProductBuckets(1))]
#[case(Partitioning::ProductBuckets(3))]
#[case(Partitioning::ProductBuckets(16))]
fn test_partitioned_run_matches_whole_run(#[case] partitioning: Partitioning) {
    let txs = workload();
    let engine = engine();
    let whole = engine.run(&txs).unwrap();
    let parts = engine.run_partitioned(&txs, partitioning).unwrap();

    assert_eq!(whole.tables.benchmarks, parts.tables.benchmarks);
    assert_eq!(whole.tables.demand, parts.tables.demand);
    assert_eq!(whole.tables.priority, parts.tables.priority);
    assert_eq!(whole.enriched.len(), parts.enriched.len());

    for (a, b) in whole.enriched.iter().zip(&parts.enriched) {
        assert_eq!(a.transaction, b.transaction);
        assert_eq!(a.price, b.price);
        assert_eq!(a.demand_tier, b.demand_tier);
        assert_eq!(a.priority_index, b.priority_index);
        // Value shares may differ in summation order.
        let (ca, cb) = (a.concentration.unwrap(), b.concentration.unwrap());
        assert_eq!(ca.flag, cb.flag);
        assert_relative_eq!(ca.index, cb.index, epsilon = 1e-12);
    }
}

#[test]
fn test_zero_buckets_rejected() {
    let result = engine().run_partitioned(&workload(), Partitioning::ProductBuckets(0));
    assert!(matches!(result, Err(EngineError::InvalidPartitioning(_))));
}

#[test]
fn test_radar_and_summary() {
    let txs = workload();
    let output = engine().run(&txs).unwrap();

    let radar = output.radar();
    assert!(!radar.is_empty());
    assert!(radar
        .entries()
        .iter()
        .all(|e| e.paid_price > 0.0 && e.quantity > 0));
    // The July spike is the largest gap.
    let top = radar.top(1);
    assert_eq!(top[0].product_key, "DIP500");
    assert_eq!(top[0].paid_price, 31.0);

    let summary = output.summary();
    assert_eq!(summary.records, txs.len());
    assert_eq!(summary.distinct_products, 4);
    assert_eq!(summary.distinct_regions, 2);
    assert!(summary.potential_savings > 0.0);
    assert_eq!(
        summary.scored + summary.unscored.values().sum::<usize>(),
        txs.len()
    );
    assert_eq!(summary.unscored.get("missing_price"), Some(&1));
    assert_eq!(summary.unscored.get("benchmark_unavailable"), Some(&1));
}
