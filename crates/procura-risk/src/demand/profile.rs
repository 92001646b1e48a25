//! Demand series, profiles and the analyzer.

use super::DemandError;
use ndarray::Array1;
use procura_data::{Granularity, Horizon, Period, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered demand stability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DemandTier {
    /// Bought in most periods with steady quantities
    Stable,
    /// Some gaps or variability
    Moderate,
    /// Frequent gaps or highly variable quantities
    Intermittent,
    /// Never bought with a positive quantity
    Inactive,
}

impl DemandTier {
    /// Tier label.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Moderate => "Moderate",
            Self::Intermittent => "Intermittent",
            Self::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for DemandTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for demand stability analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    /// Period granularity of the demand series
    pub granularity: Granularity,

    /// Zero-period fraction at which demand becomes `Moderate`
    pub zero_fraction_moderate: f64,

    /// Zero-period fraction at which demand becomes `Intermittent`
    pub zero_fraction_high: f64,

    /// Coefficient of variation at which demand becomes `Moderate`
    pub cv_moderate: f64,

    /// Coefficient of variation at which demand becomes `Intermittent`
    pub cv_high: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            zero_fraction_moderate: 0.25,
            zero_fraction_high: 0.5,
            cv_moderate: 0.5,
            cv_high: 1.0,
        }
    }
}

impl DemandConfig {
    /// Check threshold ordering.
    pub fn validate(&self) -> Result<(), DemandError> {
        let (zm, zh) = (self.zero_fraction_moderate, self.zero_fraction_high);
        if !(zm > 0.0 && zm <= zh && zh <= 1.0) {
            return Err(DemandError::InvalidZeroFraction {
                moderate: zm,
                high: zh,
            });
        }
        let (cm, ch) = (self.cv_moderate, self.cv_high);
        if !(cm > 0.0 && cm <= ch && ch.is_finite()) {
            return Err(DemandError::InvalidVariability {
                moderate: cm,
                high: ch,
            });
        }
        Ok(())
    }

    fn classify(&self, zero_fraction: f64, cv: f64) -> DemandTier {
        if zero_fraction >= self.zero_fraction_high || cv >= self.cv_high {
            DemandTier::Intermittent
        } else if zero_fraction >= self.zero_fraction_moderate || cv >= self.cv_moderate {
            DemandTier::Moderate
        } else {
            DemandTier::Stable
        }
    }
}

/// Zero-filled quantity series of one product over the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    /// Product key
    pub product_key: String,
    /// Horizon periods, in order
    pub periods: Vec<Period>,
    /// Quantity per period, zero where nothing was bought
    pub quantities: Array1<f64>,
}

impl DemandSeries {
    /// Total quantity over the horizon.
    pub fn total(&self) -> f64 {
        self.quantities.sum()
    }

    /// Number of periods with a positive quantity.
    pub fn periods_with_demand(&self) -> usize {
        self.quantities.iter().filter(|&&q| q > 0.0).count()
    }
}

/// Demand metrics and tier of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandProfile {
    /// Product key
    pub product_key: String,
    /// Periods in the horizon
    pub horizon_periods: usize,
    /// Periods with a positive quantity
    pub periods_with_demand: usize,
    /// Total quantity over all records, dated or not
    pub total_quantity: u64,
    /// Fraction of horizon periods without demand (`None` without dated demand)
    pub zero_fraction: Option<f64>,
    /// Coefficient of variation of non-zero quantities (`None` without dated demand)
    pub cv: Option<f64>,
    /// Stability tier
    ///
    /// `None` when the product was bought but none of its purchases falls
    /// in a dated period, so stability cannot be measured.
    pub tier: Option<DemandTier>,
}

impl DemandProfile {
    fn unmeasured(series: &DemandSeries, total_quantity: u64, tier: Option<DemandTier>) -> Self {
        Self {
            product_key: series.product_key.clone(),
            horizon_periods: series.quantities.len(),
            periods_with_demand: 0,
            total_quantity,
            zero_fraction: None,
            cv: None,
            tier,
        }
    }

    fn from_series(series: &DemandSeries, total_quantity: u64, config: &DemandConfig) -> Self {
        if total_quantity == 0 {
            return Self::unmeasured(series, 0, Some(DemandTier::Inactive));
        }
        let horizon_periods = series.quantities.len();
        if horizon_periods == 0 || series.total() <= 0.0 {
            return Self::unmeasured(series, total_quantity, None);
        }

        let nonzero: Array1<f64> = series
            .quantities
            .iter()
            .copied()
            .filter(|&q| q > 0.0)
            .collect();
        let periods_with_demand = nonzero.len();
        let zero_fraction = (horizon_periods - periods_with_demand) as f64 / horizon_periods as f64;

        let mean = nonzero.mean().unwrap_or(0.0);
        let cv = if mean > 0.0 {
            nonzero.std(0.0) / mean
        } else {
            0.0
        };

        Self {
            product_key: series.product_key.clone(),
            horizon_periods,
            periods_with_demand,
            total_quantity,
            zero_fraction: Some(zero_fraction),
            cv: Some(cv),
            tier: Some(config.classify(zero_fraction, cv)),
        }
    }
}

/// Per-product demand profiles over a shared horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandTable {
    /// Series granularity
    pub granularity: Granularity,
    /// Horizon spanned by dated records (`None` if no record was dated)
    pub horizon: Option<Horizon>,
    profiles: BTreeMap<String, DemandProfile>,
}

impl DemandTable {
    /// Profile of a product.
    pub fn get(&self, product_key: &str) -> Option<&DemandProfile> {
        self.profiles.get(product_key)
    }

    /// Tier of a product, if it is known and measurable.
    pub fn tier(&self, product_key: &str) -> Option<DemandTier> {
        self.profiles.get(product_key).and_then(|p| p.tier)
    }

    /// Profiles in product-key order.
    pub fn iter(&self) -> impl Iterator<Item = &DemandProfile> {
        self.profiles.values()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no product was seen.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of products per tier.
    pub fn tier_counts(&self) -> BTreeMap<DemandTier, usize> {
        let mut counts = BTreeMap::new();
        for tier in self.profiles.values().filter_map(|p| p.tier) {
            *counts.entry(tier).or_insert(0) += 1;
        }
        counts
    }

    /// Number of bought products without any dated demand.
    pub fn unmeasured_count(&self) -> usize {
        self.profiles.values().filter(|p| p.tier.is_none()).count()
    }
}

/// Quantity per product and period; the mergeable partial state of the
/// analyzer.
///
/// Every product key seen is kept with its total quantity, even when none
/// of its records is dated.
#[derive(Debug, Clone)]
pub struct DemandLedger {
    granularity: Granularity,
    products: BTreeMap<String, ProductQuantities>,
    horizon: Option<Horizon>,
}

#[derive(Debug, Clone, Default)]
struct ProductQuantities {
    total: u64,
    periods: BTreeMap<Period, u64>,
}

impl DemandLedger {
    /// Empty ledger at the given granularity.
    pub const fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            products: BTreeMap::new(),
            horizon: None,
        }
    }

    /// Collect quantities from a slice of transactions.
    pub fn collect<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
        granularity: Granularity,
    ) -> Self {
        let mut ledger = Self::new(granularity);
        for tx in transactions {
            let product = ledger.products.entry(tx.product_key.clone()).or_default();
            product.total += tx.quantity;
            let Some(period) = tx.period(granularity) else {
                continue;
            };
            *product.periods.entry(period).or_insert(0) += tx.quantity;
            match ledger.horizon.as_mut() {
                Some(horizon) => horizon.include(period),
                None => ledger.horizon = Some(Horizon::new(period, period)),
            }
        }
        ledger
    }

    /// Absorb another ledger of the same granularity.
    pub fn merge(&mut self, other: Self) {
        debug_assert_eq!(self.granularity, other.granularity);
        for (product, quantities) in other.products {
            let target = self.products.entry(product).or_default();
            target.total += quantities.total;
            for (period, quantity) in quantities.periods {
                *target.periods.entry(period).or_insert(0) += quantity;
            }
        }
        if let Some(other_horizon) = other.horizon {
            match self.horizon.as_mut() {
                Some(horizon) => {
                    horizon.include(other_horizon.first);
                    horizon.include(other_horizon.last);
                }
                None => self.horizon = Some(other_horizon),
            }
        }
    }

    /// Horizon observed so far.
    pub const fn horizon(&self) -> Option<Horizon> {
        self.horizon
    }

    /// Zero-filled series for every product, in product-key order.
    pub fn series(&self) -> Vec<DemandSeries> {
        let periods = self.horizon.map(|h| h.periods()).unwrap_or_default();
        self.products
            .iter()
            .map(|(product, observed)| {
                let mut quantities = Array1::<f64>::zeros(periods.len());
                if let Some(horizon) = self.horizon {
                    for (period, quantity) in &observed.periods {
                        if let Some(i) = horizon.position(*period) {
                            quantities[i] += *quantity as f64;
                        }
                    }
                }
                DemandSeries {
                    product_key: product.clone(),
                    periods: periods.clone(),
                    quantities,
                }
            })
            .collect()
    }

    /// Profile every product.
    pub fn finalize(self, config: &DemandConfig) -> DemandTable {
        let profiles: BTreeMap<String, DemandProfile> = self
            .series()
            .iter()
            .zip(self.products.values())
            .map(|(s, q)| {
                (
                    s.product_key.clone(),
                    DemandProfile::from_series(s, q.total, config),
                )
            })
            .collect();

        let inactive = profiles
            .values()
            .filter(|p| p.tier == Some(DemandTier::Inactive))
            .count();
        let unmeasured = profiles.values().filter(|p| p.tier.is_none()).count();
        tracing::debug!(
            products = profiles.len(),
            horizon_periods = self.horizon.map_or(0, |h| h.len()),
            inactive,
            unmeasured,
            "demand profiles computed"
        );
        if unmeasured > 0 {
            tracing::warn!(
                unmeasured,
                granularity = ?self.granularity,
                "bought products without dated demand have no demand tier"
            );
        }

        DemandTable {
            granularity: self.granularity,
            horizon: self.horizon,
            profiles,
        }
    }
}

/// Demand stability analyzer
#[derive(Debug, Clone, Default)]
pub struct DemandAnalyzer {
    config: DemandConfig,
}

impl DemandAnalyzer {
    /// Create a new analyzer, validating the configuration.
    pub fn new(config: DemandConfig) -> Result<Self, DemandError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Analyzer configuration.
    pub const fn config(&self) -> &DemandConfig {
        &self.config
    }

    /// Profile every product in the transaction set.
    pub fn analyze(&self, transactions: &[Transaction]) -> DemandTable {
        DemandLedger::collect(transactions, self.config.granularity).finalize(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn bought(product: &str, year: i32, month: u32, quantity: u64) -> Transaction {
        let date = NaiveDate::from_ymd_opt(year, month, 10).unwrap();
        Transaction::new(format!("{product}-{year}-{month}"), product, "ITEM", year)
            .with_price(1.0, quantity)
            .with_date(date)
    }

    #[test]
    fn test_regular_demand_is_stable() {
        let txs: Vec<Transaction> = (1..=12).map(|m| bought("P", 2021, m, 100)).collect();
        let table = DemandAnalyzer::default().analyze(&txs);

        let profile = table.get("P").unwrap();
        assert_eq!(profile.horizon_periods, 12);
        assert_eq!(profile.periods_with_demand, 12);
        assert_eq!(profile.total_quantity, 1200);
        assert_eq!(profile.zero_fraction, Some(0.0));
        assert_relative_eq!(profile.cv.unwrap(), 0.0);
        assert_eq!(profile.tier, Some(DemandTier::Stable));
    }

    #[test]
    fn test_zero_periods_are_filled() {
        // Q is bought once; P spans the whole year and sets the horizon.
        let mut txs: Vec<Transaction> = (1..=12).map(|m| bought("P", 2021, m, 10)).collect();
        txs.push(bought("Q", 2021, 6, 50));
        let table = DemandAnalyzer::default().analyze(&txs);

        let q = table.get("Q").unwrap();
        assert_eq!(q.horizon_periods, 12);
        assert_eq!(q.periods_with_demand, 1);
        assert_relative_eq!(q.zero_fraction.unwrap(), 11.0 / 12.0);
        assert_eq!(q.tier, Some(DemandTier::Intermittent));
    }

    #[test]
    fn test_variability_drives_tier() {
        // Bought every month, alternating 10 and 30: cv = 10 / 20 = 0.5.
        let txs: Vec<Transaction> = (1..=12)
            .map(|m| bought("P", 2021, m, if m % 2 == 0 { 10 } else { 30 }))
            .collect();
        let profile = DemandAnalyzer::default().analyze(&txs).get("P").cloned().unwrap();
        assert_relative_eq!(profile.cv.unwrap(), 0.5, epsilon = 1e-12);
        assert_eq!(profile.tier, Some(DemandTier::Moderate));
    }

    #[test]
    fn test_zero_quantity_product_is_inactive() {
        let txs = vec![bought("P", 2021, 1, 5), bought("Z", 2021, 3, 0)];
        let table = DemandAnalyzer::default().analyze(&txs);

        let z = table.get("Z").unwrap();
        assert_eq!(z.tier, Some(DemandTier::Inactive));
        assert_eq!(z.total_quantity, 0);
        assert_eq!(z.zero_fraction, None);
        assert_eq!(z.cv, None);
    }

    #[test]
    fn test_undated_records_keep_their_product() {
        let txs = vec![
            bought("P", 2021, 1, 5),
            Transaction::new("u", "U", "ITEM", 2021).with_price(2.0, 7),
        ];
        let table = DemandAnalyzer::default().analyze(&txs);
        assert_eq!(table.len(), 2);
        assert!(table.get("U").is_some());

        // At year granularity the source year dates the record.
        let yearly = DemandAnalyzer::new(DemandConfig {
            granularity: Granularity::Year,
            ..Default::default()
        })
        .unwrap()
        .analyze(&txs);
        assert_eq!(yearly.tier("U"), Some(DemandTier::Stable));
    }

    #[test]
    fn test_undated_purchase_is_not_inactive() {
        let txs = vec![
            bought("P", 2021, 1, 5),
            Transaction::new("u", "U", "ITEM", 2021).with_price(2.0, 7),
        ];
        let table = DemandAnalyzer::default().analyze(&txs);

        let u = table.get("U").unwrap();
        assert_ne!(u.tier, Some(DemandTier::Inactive));
        assert_eq!(u.tier, None);
        assert_eq!(u.total_quantity, 7);
        assert_eq!(u.periods_with_demand, 0);
        assert_eq!(u.zero_fraction, None);
        assert_eq!(u.cv, None);
        assert_eq!(table.tier("U"), None);
        assert_eq!(table.unmeasured_count(), 1);
        assert_eq!(table.tier_counts().get(&DemandTier::Inactive), None);
    }

    #[test]
    fn test_undated_quantity_adds_to_total() {
        let txs = vec![
            bought("P", 2021, 1, 5),
            bought("P", 2021, 2, 5),
            Transaction::new("u", "P", "ITEM", 2021).with_price(1.0, 4),
        ];
        let p = DemandAnalyzer::default().analyze(&txs).get("P").cloned().unwrap();
        assert_eq!(p.total_quantity, 14);
        assert_eq!(p.periods_with_demand, 2);
        assert_eq!(p.tier, Some(DemandTier::Stable));
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let txs: Vec<Transaction> = (1..=6)
            .map(|m| bought("P", 2021, m, m as u64))
            .chain((1..=3).map(|m| bought("P", 2022, m, 4)))
            .collect();
        let config = DemandConfig::default();

        let whole = DemandLedger::collect(&txs, config.granularity).finalize(&config);
        let mut merged = DemandLedger::collect(&txs[6..], config.granularity);
        merged.merge(DemandLedger::collect(&txs[..6], config.granularity));
        let merged = merged.finalize(&config);

        assert_eq!(whole, merged);
        assert_eq!(whole.get("P").unwrap().horizon_periods, 15);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = DemandConfig {
            zero_fraction_moderate: 0.8,
            zero_fraction_high: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            DemandAnalyzer::new(config),
            Err(DemandError::InvalidZeroFraction { .. })
        ));
    }
}
