//! Benchmark groups and the lookup table built from them.

use super::estimate::BenchmarkConfig;
use procura_data::{Period, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Grouping granularity, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupLevel {
    /// Normalized product key
    Product,
    /// Product category
    Category,
    /// Leading words of the product description
    DescriptionPrefix,
}

impl GroupLevel {
    /// Short label for tables.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::DescriptionPrefix => "description_prefix",
        }
    }
}

impl fmt::Display for GroupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Time window of a benchmark group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WindowKey {
    /// A single year, quarter or month
    Period(Period),
    /// The whole analysis horizon
    Horizon,
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period(p) => write!(f, "{}", p),
            Self::Horizon => write!(f, "horizon"),
        }
    }
}

/// Identifies one benchmark group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BenchmarkKey {
    /// Grouping level
    pub level: GroupLevel,
    /// Group value at that level (product key, category or prefix)
    pub key: String,
    /// Time window
    pub window: WindowKey,
}

impl BenchmarkKey {
    /// Create a new key.
    pub fn new(level: GroupLevel, key: impl Into<String>, window: WindowKey) -> Self {
        Self {
            level,
            key: key.into(),
            window,
        }
    }
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.level, self.key, self.window)
    }
}

/// Summary statistics of one benchmark group.
///
/// `median` and `dispersion` are only defined for valid groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkGroup {
    /// Group key
    pub key: BenchmarkKey,
    /// Number of positive prices in the group
    pub sample_count: usize,
    /// Median unit price (the benchmark)
    pub median: Option<f64>,
    /// Dispersion after applying the floor
    pub dispersion: Option<f64>,
    /// Dispersion as measured, before the floor
    pub raw_dispersion: Option<f64>,
    /// Whether the group met the minimum sample threshold
    pub valid: bool,
}

impl BenchmarkGroup {
    /// A group below the sample threshold.
    pub const fn invalid(key: BenchmarkKey, sample_count: usize) -> Self {
        Self {
            key,
            sample_count,
            median: None,
            dispersion: None,
            raw_dispersion: None,
            valid: false,
        }
    }

    /// Benchmark price and floored dispersion, if the group is valid.
    pub fn benchmark(&self) -> Option<(f64, f64)> {
        if !self.valid {
            return None;
        }
        self.median.zip(self.dispersion)
    }

    /// Whether the dispersion floor replaced the measured value.
    pub fn floor_applied(&self) -> bool {
        match (self.raw_dispersion, self.dispersion) {
            (Some(raw), Some(floored)) => floored > raw,
            _ => false,
        }
    }
}

/// All benchmark groups of a run, with the lookup policy used to resolve a
/// transaction to its benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkTable {
    config: BenchmarkConfig,
    groups: BTreeMap<BenchmarkKey, BenchmarkGroup>,
}

impl BenchmarkTable {
    pub(crate) const fn new(
        config: BenchmarkConfig,
        groups: BTreeMap<BenchmarkKey, BenchmarkGroup>,
    ) -> Self {
        Self { config, groups }
    }

    /// Configuration the table was built with.
    pub const fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Look up a group by key.
    pub fn get(&self, key: &BenchmarkKey) -> Option<&BenchmarkGroup> {
        self.groups.get(key)
    }

    /// Iterate groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = &BenchmarkGroup> {
        self.groups.values()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the table holds no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of valid groups.
    pub fn valid_count(&self) -> usize {
        self.groups.values().filter(|g| g.valid).count()
    }

    /// First valid group along the transaction's candidate keys.
    ///
    /// Narrower windows win over the horizon, and the product level wins
    /// over category and description-prefix fallbacks.
    pub fn resolve(&self, transaction: &Transaction) -> Option<&BenchmarkGroup> {
        self.config
            .candidate_keys(transaction)
            .iter()
            .filter_map(|key| self.groups.get(key))
            .find(|group| group.valid)
    }
}
