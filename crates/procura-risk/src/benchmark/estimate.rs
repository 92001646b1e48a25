//! Benchmark estimator
//!
//! Partitions positive unit prices by grouping key, then summarizes each
//! partition with its median and a dispersion measure. Partial sample sets
//! can be collected per data partition and merged before summarizing, so
//! medians are always computed from complete samples.

use super::BenchmarkError;
use super::groups::{BenchmarkGroup, BenchmarkKey, BenchmarkTable, GroupLevel, WindowKey};
use crate::stats::{median_absolute_deviation, median_sorted, sample_std, sort_samples};
use procura_data::{Granularity, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time window used for the finest benchmark groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkWindow {
    /// One group per product over the whole horizon
    Horizon,
    /// Per product and calendar year, falling back to the horizon
    Year,
    /// Per product and quarter, falling back to the horizon
    Quarter,
    /// Per product and month, falling back to the horizon
    Month,
}

impl BenchmarkWindow {
    /// Period granularity of the narrow window, if any.
    pub const fn granularity(&self) -> Option<Granularity> {
        match self {
            Self::Horizon => None,
            Self::Year => Some(Granularity::Year),
            Self::Quarter => Some(Granularity::Quarter),
            Self::Month => Some(Granularity::Month),
        }
    }
}

/// Dispersion measure for deviation scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispersionMeasure {
    /// Median absolute deviation, scaled by `mad_scale`
    Mad,
    /// Sample standard deviation
    StdDev,
}

/// Coarser groupings tried when the product-level group is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Fall back to the product category when present
    pub category: bool,
    /// Number of leading description words for the prefix grouping (0 disables)
    pub description_words: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            category: true,
            description_words: 1,
        }
    }
}

/// Configuration for benchmark estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Minimum number of samples for a valid group
    pub min_samples: usize,

    /// Narrowest time window for product-level groups
    pub window: BenchmarkWindow,

    /// Dispersion measure
    pub dispersion: DispersionMeasure,

    /// Consistency constant applied to the MAD (1.4826 matches the standard
    /// deviation for normal data)
    pub mad_scale: f64,

    /// Absolute dispersion floor
    pub min_dispersion: f64,

    /// Dispersion floor as a fraction of the group median
    pub relative_dispersion_floor: f64,

    /// Fallback groupings
    pub fallback: FallbackConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            window: BenchmarkWindow::Horizon,
            dispersion: DispersionMeasure::Mad,
            mad_scale: 1.4826,
            min_dispersion: 0.01,
            relative_dispersion_floor: 0.01,
            fallback: FallbackConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Check the configuration for structurally invalid values.
    pub fn validate(&self) -> Result<(), BenchmarkError> {
        if self.min_samples == 0 {
            return Err(BenchmarkError::InvalidMinSamples(self.min_samples));
        }
        if !(self.mad_scale.is_finite() && self.mad_scale > 0.0) {
            return Err(BenchmarkError::InvalidParameter(format!(
                "mad_scale must be positive, got {}",
                self.mad_scale
            )));
        }
        if !(self.min_dispersion.is_finite() && self.min_dispersion > 0.0) {
            return Err(BenchmarkError::InvalidParameter(format!(
                "min_dispersion must be positive, got {}",
                self.min_dispersion
            )));
        }
        if !(self.relative_dispersion_floor.is_finite() && self.relative_dispersion_floor >= 0.0) {
            return Err(BenchmarkError::InvalidParameter(format!(
                "relative_dispersion_floor must be non-negative, got {}",
                self.relative_dispersion_floor
            )));
        }
        Ok(())
    }

    /// Smallest dispersion allowed for a group with the given median.
    pub fn dispersion_floor(&self, median: f64) -> f64 {
        self.min_dispersion
            .max(self.relative_dispersion_floor * median.abs())
    }

    /// Benchmark groups a transaction belongs to, finest first.
    pub fn candidate_keys(&self, transaction: &Transaction) -> Vec<BenchmarkKey> {
        let mut keys = Vec::with_capacity(4);
        let product = transaction.product_key.as_str();

        if let Some(period) = self
            .window
            .granularity()
            .and_then(|g| transaction.period(g))
        {
            keys.push(BenchmarkKey::new(
                GroupLevel::Product,
                product,
                WindowKey::Period(period),
            ));
        }
        keys.push(BenchmarkKey::new(
            GroupLevel::Product,
            product,
            WindowKey::Horizon,
        ));

        if self.fallback.category {
            if let Some(category) = transaction.category_key() {
                keys.push(BenchmarkKey::new(
                    GroupLevel::Category,
                    category,
                    WindowKey::Horizon,
                ));
            }
        }
        if let Some(prefix) = transaction.description_prefix(self.fallback.description_words) {
            keys.push(BenchmarkKey::new(
                GroupLevel::DescriptionPrefix,
                prefix,
                WindowKey::Horizon,
            ));
        }
        keys
    }

    fn summarize(&self, key: BenchmarkKey, mut samples: Vec<f64>) -> BenchmarkGroup {
        let sample_count = samples.len();
        if sample_count < self.min_samples {
            return BenchmarkGroup::invalid(key, sample_count);
        }

        sort_samples(&mut samples);
        let Some(median) = median_sorted(&samples) else {
            return BenchmarkGroup::invalid(key, sample_count);
        };
        let raw = match self.dispersion {
            DispersionMeasure::Mad => {
                median_absolute_deviation(&samples, median).map(|mad| mad * self.mad_scale)
            }
            DispersionMeasure::StdDev => sample_std(&samples),
        }
        .unwrap_or(0.0);

        BenchmarkGroup {
            key,
            sample_count,
            median: Some(median),
            dispersion: Some(raw.max(self.dispersion_floor(median))),
            raw_dispersion: Some(raw),
            valid: true,
        }
    }
}

/// Complete price samples per benchmark group.
///
/// This is the mergeable partial state of the estimator: collect one per
/// data partition, [`merge`](Self::merge) them, then
/// [`finalize`](Self::finalize).
#[derive(Debug, Clone, Default)]
pub struct BenchmarkSamples {
    samples: BTreeMap<BenchmarkKey, Vec<f64>>,
}

impl BenchmarkSamples {
    /// Collect samples from a slice of transactions.
    ///
    /// Only positive, finite unit prices enter a sample; each one is added
    /// to every candidate group of its transaction.
    pub fn collect<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
        config: &BenchmarkConfig,
    ) -> Self {
        let mut samples: BTreeMap<BenchmarkKey, Vec<f64>> = BTreeMap::new();
        for tx in transactions {
            let Some(price) = tx.scorable_price() else {
                continue;
            };
            for key in config.candidate_keys(tx) {
                samples.entry(key).or_default().push(price);
            }
        }
        Self { samples }
    }

    /// Absorb another partial sample set.
    pub fn merge(&mut self, other: Self) {
        for (key, mut values) in other.samples {
            self.samples.entry(key).or_default().append(&mut values);
        }
    }

    /// Number of groups seen so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been collected.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summarize every group.
    pub fn finalize(self, config: &BenchmarkConfig) -> BenchmarkTable {
        let groups: BTreeMap<BenchmarkKey, BenchmarkGroup> = self
            .samples
            .into_iter()
            .map(|(key, values)| (key.clone(), config.summarize(key, values)))
            .collect();

        let valid = groups.values().filter(|g| g.valid).count();
        let floored = groups.values().filter(|g| g.floor_applied()).count();
        tracing::debug!(
            groups = groups.len(),
            valid,
            invalid = groups.len() - valid,
            floored,
            "benchmark groups summarized"
        );

        BenchmarkTable::new(config.clone(), groups)
    }
}

/// Benchmark price estimator
#[derive(Debug, Clone, Default)]
pub struct BenchmarkEstimator {
    config: BenchmarkConfig,
}

impl BenchmarkEstimator {
    /// Create a new estimator, validating the configuration.
    pub fn new(config: BenchmarkConfig) -> Result<Self, BenchmarkError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Estimator configuration.
    pub const fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Estimate benchmark groups over the full transaction set.
    pub fn estimate(&self, transactions: &[Transaction]) -> BenchmarkTable {
        BenchmarkSamples::collect(transactions, &self.config).finalize(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn tx(id: &str, product: &str, price: f64) -> Transaction {
        Transaction::new(id, product, "DIPIRONA 500MG", 2021).with_price(price, 10)
    }

    #[test]
    fn test_config_default() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.min_samples, 3);
        assert_eq!(config.window, BenchmarkWindow::Horizon);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_min_samples_rejected() {
        let config = BenchmarkConfig {
            min_samples: 0,
            ..Default::default()
        };
        assert!(matches!(
            BenchmarkEstimator::new(config),
            Err(BenchmarkError::InvalidMinSamples(0))
        ));
    }

    #[test]
    fn test_median_and_floor() {
        let estimator = BenchmarkEstimator::new(BenchmarkConfig {
            min_samples: 2,
            ..Default::default()
        })
        .unwrap();
        let txs = vec![tx("1", "P", 100.0), tx("2", "P", 100.0), tx("3", "P", 400.0)];
        let table = estimator.estimate(&txs);

        let group = table.resolve(&txs[0]).unwrap();
        assert_eq!(group.key.level, GroupLevel::Product);
        assert_eq!(group.sample_count, 3);
        assert_eq!(group.median, Some(100.0));
        // MAD is zero, so the 1% relative floor applies.
        assert_eq!(group.raw_dispersion, Some(0.0));
        assert_relative_eq!(group.dispersion.unwrap(), 1.0);
        assert!(group.floor_applied());
    }

    #[test]
    fn test_nonpositive_prices_excluded() {
        let estimator = BenchmarkEstimator::default();
        let mut txs = vec![tx("1", "P", 10.0), tx("2", "P", 12.0), tx("3", "P", 0.0)];
        txs.push(Transaction::new("4", "P", "DIPIRONA", 2021));
        let table = estimator.estimate(&txs);

        let key = BenchmarkKey::new(GroupLevel::Product, "P", WindowKey::Horizon);
        let group = table.get(&key).unwrap();
        assert_eq!(group.sample_count, 2);
        assert!(!group.valid);
        assert!(group.median.is_none());
    }

    #[test]
    fn test_narrow_window_takes_precedence() {
        let config = BenchmarkConfig {
            min_samples: 2,
            window: BenchmarkWindow::Year,
            ..Default::default()
        };
        let estimator = BenchmarkEstimator::new(config).unwrap();
        let d21 = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
        let d22 = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        let txs = vec![
            tx("1", "P", 10.0).with_date(d21),
            tx("2", "P", 12.0).with_date(d21),
            tx("3", "P", 30.0).with_date(d22),
        ];
        let table = estimator.estimate(&txs);

        let narrow = table.resolve(&txs[0]).unwrap();
        assert!(matches!(narrow.key.window, WindowKey::Period(_)));
        assert_eq!(narrow.median, Some(11.0));

        // 2022 holds a single sample, so the horizon group is used.
        let wide = table.resolve(&txs[2]).unwrap();
        assert_eq!(wide.key.window, WindowKey::Horizon);
        assert_eq!(wide.median, Some(12.0));
    }

    #[test]
    fn test_fallback_to_category_then_prefix() {
        let estimator = BenchmarkEstimator::default();
        let txs = vec![
            tx("1", "A", 10.0).with_category("ANALGESICS"),
            tx("2", "B", 11.0).with_category("ANALGESICS"),
            tx("3", "C", 12.0).with_category("ANALGESICS"),
            tx("4", "D", 13.0),
        ];
        let table = estimator.estimate(&txs);

        let by_category = table.resolve(&txs[0]).unwrap();
        assert_eq!(by_category.key.level, GroupLevel::Category);
        assert_eq!(by_category.median, Some(11.0));

        // D has no category; all four share the "DIPIRONA" prefix.
        let by_prefix = table.resolve(&txs[3]).unwrap();
        assert_eq!(by_prefix.key.level, GroupLevel::DescriptionPrefix);
        assert_eq!(by_prefix.key.key, "DIPIRONA");
        assert_eq!(by_prefix.sample_count, 4);
    }

    #[test]
    fn test_unavailable_when_all_levels_invalid() {
        let config = BenchmarkConfig {
            min_samples: 3,
            fallback: FallbackConfig {
                category: true,
                description_words: 0,
            },
            ..Default::default()
        };
        let estimator = BenchmarkEstimator::new(config).unwrap();
        let txs = vec![tx("1", "P", 10.0)];
        assert!(estimator.estimate(&txs).resolve(&txs[0]).is_none());
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let config = BenchmarkConfig::default();
        let txs: Vec<Transaction> = (0..9)
            .map(|i| tx(&i.to_string(), "P", 10.0 + i as f64))
            .collect();

        let whole = BenchmarkSamples::collect(&txs, &config).finalize(&config);
        let mut merged = BenchmarkSamples::collect(&txs[..4], &config);
        merged.merge(BenchmarkSamples::collect(&txs[4..], &config));
        let merged = merged.finalize(&config);

        let key = BenchmarkKey::new(GroupLevel::Product, "P", WindowKey::Horizon);
        assert_eq!(whole.get(&key), merged.get(&key));
        assert_eq!(merged.get(&key).unwrap().median, Some(14.0));
    }

    #[test]
    fn test_std_dev_measure() {
        let config = BenchmarkConfig {
            dispersion: DispersionMeasure::StdDev,
            ..Default::default()
        };
        let txs: Vec<Transaction> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, p)| tx(&i.to_string(), "P", *p))
            .collect();
        let table = BenchmarkEstimator::new(config).unwrap().estimate(&txs);
        let group = table.resolve(&txs[0]).unwrap();
        assert_relative_eq!(group.dispersion.unwrap(), 2.5_f64.sqrt(), epsilon = 1e-12);
    }
}
