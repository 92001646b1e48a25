//! Supplier shares and concentration indices.

use super::ConcentrationError;
use procura_data::{RegionKey, SupplierKey, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Index values this close to 1 are treated as a single supplier.
const SOLE_SUPPLIER_TOLERANCE: f64 = 1e-12;

/// Concentration index formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationFormula {
    /// Largest supplier share
    MaxShare,
    /// Sum of squared supplier shares
    Herfindahl,
}

/// Aggregation scope for supplier totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationScope {
    /// One aggregate per (product, region)
    Region,
    /// One aggregate per product across all regions
    Global,
}

/// Configuration for concentration analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcentrationConfig {
    /// Index formula
    pub formula: ConcentrationFormula,
    /// Index at or above which a pair is flagged `High`
    pub high_threshold: f64,
    /// Aggregation scope
    pub scope: ConcentrationScope,
}

impl Default for ConcentrationConfig {
    fn default() -> Self {
        Self {
            formula: ConcentrationFormula::MaxShare,
            high_threshold: 0.8,
            scope: ConcentrationScope::Region,
        }
    }
}

impl ConcentrationConfig {
    /// Check the threshold range.
    pub fn validate(&self) -> Result<(), ConcentrationError> {
        if !(self.high_threshold > 0.0 && self.high_threshold <= 1.0) {
            return Err(ConcentrationError::InvalidThreshold(self.high_threshold));
        }
        Ok(())
    }
}

/// Key of one supplier aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConcentrationKey {
    /// Product key
    pub product_key: String,
    /// Region, or `None` for the global scope
    pub region: Option<RegionKey>,
}

impl ConcentrationKey {
    /// Key a transaction aggregates into under `scope`.
    pub fn for_transaction(transaction: &Transaction, scope: ConcentrationScope) -> Self {
        Self {
            product_key: transaction.product_key.clone(),
            region: match scope {
                ConcentrationScope::Region => Some(transaction.region_key()),
                ConcentrationScope::Global => None,
            },
        }
    }

    /// Region label, `"all"` under the global scope.
    pub fn region_label(&self) -> &str {
        self.region.as_ref().map_or("all", |r| r.label())
    }
}

impl fmt::Display for ConcentrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product_key, self.region_label())
    }
}

/// Quantity the shares were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareBasis {
    /// Positive purchased value
    Value,
    /// Quantity, when no positive value was recorded
    Quantity,
    /// Record count, when neither value nor quantity is positive
    Count,
}

impl ShareBasis {
    /// Basis label.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Quantity => "quantity",
            Self::Count => "count",
        }
    }
}

/// Ordered concentration risk flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConcentrationFlag {
    /// Below the high threshold
    Diversified,
    /// At or above the high threshold
    High,
    /// Served by a single supplier
    SoleSupplier,
}

impl ConcentrationFlag {
    /// Flag label.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Diversified => "Diversified",
            Self::High => "High",
            Self::SoleSupplier => "SoleSupplier",
        }
    }
}

impl fmt::Display for ConcentrationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Concentration of one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierConcentration {
    /// Aggregate key
    pub key: ConcentrationKey,
    /// Distinct suppliers, `Unknown` counting as one
    pub supplier_count: usize,
    /// Quantity the shares were computed from
    pub basis: ShareBasis,
    /// Positive purchased value of the aggregate
    pub total_value: f64,
    /// Share per supplier; sums to 1
    pub shares: BTreeMap<SupplierKey, f64>,
    /// Supplier with the largest share (first in key order on ties)
    pub top_supplier: SupplierKey,
    /// Largest share
    pub top_share: f64,
    /// Concentration index in (0, 1]
    pub index: f64,
    /// Risk flag
    pub flag: ConcentrationFlag,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SupplierTotals {
    value: f64,
    quantity: u64,
    records: usize,
}

impl SupplierTotals {
    fn add(&mut self, other: Self) {
        self.value += other.value;
        self.quantity += other.quantity;
        self.records += other.records;
    }
}

/// Per-supplier totals per aggregate key; the mergeable partial state of
/// the analyzer.
#[derive(Debug, Clone)]
pub struct SupplierLedger {
    scope: ConcentrationScope,
    totals: BTreeMap<ConcentrationKey, BTreeMap<SupplierKey, SupplierTotals>>,
}

impl SupplierLedger {
    /// Empty ledger for the given scope.
    pub const fn new(scope: ConcentrationScope) -> Self {
        Self {
            scope,
            totals: BTreeMap::new(),
        }
    }

    /// Collect supplier totals from a slice of transactions.
    pub fn collect<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
        scope: ConcentrationScope,
    ) -> Self {
        let mut ledger = Self::new(scope);
        for tx in transactions {
            let value = if tx.total_value.is_finite() && tx.total_value > 0.0 {
                tx.total_value
            } else {
                0.0
            };
            ledger
                .totals
                .entry(ConcentrationKey::for_transaction(tx, scope))
                .or_default()
                .entry(tx.supplier_key())
                .or_default()
                .add(SupplierTotals {
                    value,
                    quantity: tx.quantity,
                    records: 1,
                });
        }
        ledger
    }

    /// Absorb another ledger of the same scope.
    pub fn merge(&mut self, other: Self) {
        debug_assert_eq!(self.scope, other.scope);
        for (key, suppliers) in other.totals {
            let target = self.totals.entry(key).or_default();
            for (supplier, totals) in suppliers {
                target.entry(supplier).or_default().add(totals);
            }
        }
    }

    /// Number of aggregates seen so far.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Compute shares, index and flag for every aggregate.
    pub fn finalize(self, config: &ConcentrationConfig) -> ConcentrationTable {
        let entries: BTreeMap<ConcentrationKey, SupplierConcentration> = self
            .totals
            .into_iter()
            .filter_map(|(key, suppliers)| {
                summarize(key.clone(), &suppliers, config).map(|entry| (key, entry))
            })
            .collect();

        let sole = entries
            .values()
            .filter(|e| e.flag == ConcentrationFlag::SoleSupplier)
            .count();
        tracing::debug!(
            aggregates = entries.len(),
            sole_supplier = sole,
            "supplier concentration computed"
        );

        ConcentrationTable {
            scope: self.scope,
            entries,
        }
    }
}

fn summarize(
    key: ConcentrationKey,
    suppliers: &BTreeMap<SupplierKey, SupplierTotals>,
    config: &ConcentrationConfig,
) -> Option<SupplierConcentration> {
    let total_value: f64 = suppliers.values().map(|t| t.value).sum();
    let total_quantity: u64 = suppliers.values().map(|t| t.quantity).sum();
    let (basis, weight): (ShareBasis, fn(&SupplierTotals) -> f64) = if total_value > 0.0 {
        (ShareBasis::Value, |t: &SupplierTotals| t.value)
    } else if total_quantity > 0 {
        (ShareBasis::Quantity, |t: &SupplierTotals| t.quantity as f64)
    } else {
        (ShareBasis::Count, |t: &SupplierTotals| t.records as f64)
    };

    let denominator: f64 = suppliers.values().map(weight).sum();
    if denominator <= 0.0 {
        return None;
    }
    let shares: BTreeMap<SupplierKey, f64> = suppliers
        .iter()
        .map(|(supplier, totals)| (supplier.clone(), weight(totals) / denominator))
        .collect();

    let (top_supplier, top_share) = shares.iter().fold(
        (None::<&SupplierKey>, f64::NEG_INFINITY),
        |(best, best_share), (supplier, &share)| {
            if share > best_share {
                (Some(supplier), share)
            } else {
                (best, best_share)
            }
        },
    );
    let top_supplier = top_supplier?.clone();

    let index = match config.formula {
        ConcentrationFormula::MaxShare => top_share,
        ConcentrationFormula::Herfindahl => shares.values().map(|s| s * s).sum(),
    };
    let supplier_count = shares.len();
    let flag = if supplier_count == 1 || index >= 1.0 - SOLE_SUPPLIER_TOLERANCE {
        ConcentrationFlag::SoleSupplier
    } else if index >= config.high_threshold {
        ConcentrationFlag::High
    } else {
        ConcentrationFlag::Diversified
    };

    Some(SupplierConcentration {
        key,
        supplier_count,
        basis,
        total_value,
        shares,
        top_supplier,
        top_share,
        index,
        flag,
    })
}

/// Concentration per aggregate key.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationTable {
    scope: ConcentrationScope,
    entries: BTreeMap<ConcentrationKey, SupplierConcentration>,
}

impl ConcentrationTable {
    /// Aggregation scope.
    pub const fn scope(&self) -> ConcentrationScope {
        self.scope
    }

    /// Entry for a key.
    pub fn get(&self, key: &ConcentrationKey) -> Option<&SupplierConcentration> {
        self.entries.get(key)
    }

    /// Entry a transaction belongs to.
    pub fn lookup(&self, transaction: &Transaction) -> Option<&SupplierConcentration> {
        self.entries
            .get(&ConcentrationKey::for_transaction(transaction, self.scope))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &SupplierConcentration> {
        self.entries.values()
    }

    /// Number of aggregates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of aggregates per flag.
    pub fn flag_counts(&self) -> BTreeMap<ConcentrationFlag, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.flag).or_insert(0) += 1;
        }
        counts
    }
}

/// Supplier concentration analyzer
#[derive(Debug, Clone, Default)]
pub struct ConcentrationAnalyzer {
    config: ConcentrationConfig,
}

impl ConcentrationAnalyzer {
    /// Create a new analyzer, validating the configuration.
    pub fn new(config: ConcentrationConfig) -> Result<Self, ConcentrationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Analyzer configuration.
    pub const fn config(&self) -> &ConcentrationConfig {
        &self.config
    }

    /// Compute concentration for every aggregate in the transaction set.
    pub fn analyze(&self, transactions: &[Transaction]) -> ConcentrationTable {
        SupplierLedger::collect(transactions, self.config.scope).finalize(&self.config)
    }
}
