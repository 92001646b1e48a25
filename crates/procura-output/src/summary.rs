//! Run summary
//!
//! Consolidated statistics of one engine run: spend, coverage, tier and flag
//! distributions, and the savings total.

use procura_risk::assemble::EnrichedTransaction;
use procura_risk::benchmark::BenchmarkTable;
use procura_risk::deviation::PriceAssessment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Consolidated statistics of an engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Input records (equals enriched records)
    pub records: usize,

    /// Records with a deviation score
    pub scored: usize,

    /// Unscored records per reason
    pub unscored: BTreeMap<String, usize>,

    /// Sum of finite line values
    pub total_spend: f64,

    /// Spend per purchase year
    pub spend_by_year: BTreeMap<i32, f64>,

    /// Distinct product keys
    pub distinct_products: usize,

    /// Distinct regions, `<unknown>` counting as one
    pub distinct_regions: usize,

    /// Distinct suppliers, `<unknown>` counting as one
    pub distinct_suppliers: usize,

    /// Benchmark groups built
    pub benchmark_groups: usize,

    /// Benchmark groups meeting the sample threshold
    pub valid_benchmark_groups: usize,

    /// Records per price tier (including `Unscored`)
    pub price_tiers: BTreeMap<String, usize>,

    /// Records per demand tier
    pub demand_tiers: BTreeMap<String, usize>,

    /// Records per concentration flag
    pub concentration_flags: BTreeMap<String, usize>,

    /// Sum of potential savings over scored records
    pub potential_savings: f64,
}

impl RunSummary {
    /// Summarize enriched transactions and the benchmark table.
    pub fn new(enriched: &[EnrichedTransaction], benchmarks: &BenchmarkTable) -> Self {
        let mut unscored = BTreeMap::new();
        let mut spend_by_year = BTreeMap::new();
        let mut price_tiers = BTreeMap::new();
        let mut demand_tiers = BTreeMap::new();
        let mut concentration_flags = BTreeMap::new();
        let mut products = BTreeSet::new();
        let mut regions = BTreeSet::new();
        let mut suppliers = BTreeSet::new();
        let mut total_spend = 0.0;
        let mut potential_savings = 0.0;

        for e in enriched {
            let tx = &e.transaction;
            if tx.total_value.is_finite() {
                total_spend += tx.total_value;
                *spend_by_year.entry(tx.year()).or_insert(0.0) += tx.total_value;
            }
            products.insert(tx.product_key.as_str());
            regions.insert(tx.region_key());
            suppliers.insert(tx.supplier_key());

            *price_tiers.entry(e.price.label().to_string()).or_insert(0) += 1;
            match &e.price {
                PriceAssessment::Scored(score) => potential_savings += score.potential_savings,
                PriceAssessment::Unscored(reason) => {
                    *unscored.entry(reason.name().to_string()).or_insert(0) += 1;
                }
            }
            if let Some(tier) = e.demand_tier {
                *demand_tiers.entry(tier.name().to_string()).or_insert(0) += 1;
            }
            if let Some(c) = e.concentration {
                *concentration_flags
                    .entry(c.flag.name().to_string())
                    .or_insert(0) += 1;
            }
        }

        let unscored_total: usize = unscored.values().sum();
        Self {
            records: enriched.len(),
            scored: enriched.len() - unscored_total,
            unscored,
            total_spend,
            spend_by_year,
            distinct_products: products.len(),
            distinct_regions: regions.len(),
            distinct_suppliers: suppliers.len(),
            benchmark_groups: benchmarks.len(),
            valid_benchmark_groups: benchmarks.valid_count(),
            price_tiers,
            demand_tiers,
            concentration_flags,
            potential_savings,
        }
    }

    /// Share of records with a deviation score.
    pub fn scored_ratio(&self) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        self.scored as f64 / self.records as f64
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nRun Summary\n");
        output.push_str(&"=".repeat(60));
        output.push('\n');
        output.push_str(&format!("  Records:                {}\n", self.records));
        output.push_str(&format!(
            "  Scored:                 {} ({:.1}%)\n",
            self.scored,
            self.scored_ratio() * 100.0
        ));
        for (reason, count) in &self.unscored {
            output.push_str(&format!("    unscored/{:<14} {}\n", reason, count));
        }
        output.push_str(&format!("  Total spend:            {:.2}\n", self.total_spend));
        output.push_str(&format!(
            "  Potential savings:      {:.2}\n",
            self.potential_savings
        ));
        output.push_str(&format!(
            "  Products / regions / suppliers: {} / {} / {}\n",
            self.distinct_products, self.distinct_regions, self.distinct_suppliers
        ));
        output.push_str(&format!(
            "  Benchmark groups:       {} ({} valid)\n",
            self.benchmark_groups, self.valid_benchmark_groups
        ));

        if !self.spend_by_year.is_empty() {
            output.push_str("\nSpend by Year:\n");
            output.push_str(&"-".repeat(60));
            output.push('\n');
            for (year, spend) in &self.spend_by_year {
                output.push_str(&format!("  {:<8} {:>20.2}\n", year, spend));
            }
        }

        for (title, counts) in [
            ("Price Tiers", &self.price_tiers),
            ("Demand Tiers", &self.demand_tiers),
            ("Concentration Flags", &self.concentration_flags),
        ] {
            if counts.is_empty() {
                continue;
            }
            output.push_str(&format!("\n{}:\n", title));
            output.push_str(&"-".repeat(60));
            output.push('\n');
            for (label, count) in counts {
                output.push_str(&format!("  {:<20} {:>10}\n", label, count));
            }
        }

        output.push_str(&"=".repeat(60));
        output.push('\n');
        output
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Summary: {} records", self.records)?;
        writeln!(
            f,
            "  Scored: {} ({:.1}%)",
            self.scored,
            self.scored_ratio() * 100.0
        )?;
        writeln!(f, "  Total spend: {:.2}", self.total_spend)?;
        writeln!(f, "  Potential savings: {:.2}", self.potential_savings)?;
        writeln!(
            f,
            "  Products: {}, regions: {}, suppliers: {}",
            self.distinct_products, self.distinct_regions, self.distinct_suppliers
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use procura_data::Transaction;
    use procura_risk::benchmark::BenchmarkEstimator;
    use procura_risk::deviation::UnscoredReason;

    fn unscored(tx: Transaction) -> EnrichedTransaction {
        EnrichedTransaction {
            transaction: tx,
            price: PriceAssessment::Unscored(UnscoredReason::BenchmarkUnavailable),
            demand_tier: None,
            concentration: None,
            priority_index: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let txs = vec![
            Transaction::new("1", "P", "ITEM", 2020)
                .with_price(2.0, 5)
                .with_region("SP"),
            Transaction::new("2", "Q", "ITEM", 2021)
                .with_price(3.0, 1)
                .with_region("RJ")
                .with_supplier("A"),
            Transaction::new("3", "Q", "ITEM", 2021).with_price(1.0, 4),
        ];
        let benchmarks = BenchmarkEstimator::default().estimate(&txs);
        let enriched: Vec<EnrichedTransaction> = txs.into_iter().map(unscored).collect();
        let summary = RunSummary::new(&enriched, &benchmarks);

        assert_eq!(summary.records, 3);
        assert_eq!(summary.scored, 0);
        assert_eq!(summary.unscored.get("benchmark_unavailable"), Some(&3));
        assert_relative_eq!(summary.total_spend, 17.0);
        assert_relative_eq!(summary.spend_by_year[&2020], 10.0);
        assert_relative_eq!(summary.spend_by_year[&2021], 7.0);
        assert_eq!(summary.distinct_products, 2);
        assert_eq!(summary.distinct_regions, 3);
        assert_eq!(summary.distinct_suppliers, 2);
        assert_eq!(summary.price_tiers.get("Unscored"), Some(&3));
        assert!(summary.to_ascii_table().contains("Spend by Year"));
        assert!(summary.to_string().contains("3 records"));
    }
}
