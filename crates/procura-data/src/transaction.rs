//! Canonical purchase transaction.

use crate::keys::{AttributeKey, RegionKey, SupplierKey};
use crate::period::{Granularity, Period};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One purchase line item, as delivered by the ingestion stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque record identifier assigned upstream
    pub id: String,

    /// Normalized product identifier
    pub product_key: String,

    /// Free-text product description
    pub description: String,

    /// Optional product category used as a coarser benchmark grouping
    pub category: Option<String>,

    /// Unit price; only positive finite values are scorable
    pub unit_price: Option<f64>,

    /// Quantity purchased
    pub quantity: u64,

    /// Total value of the line item
    pub total_value: f64,

    /// Supplier identifier
    pub supplier: Option<String>,

    /// Buyer region identifier
    pub region: Option<String>,

    /// Purchase date
    pub purchase_date: Option<NaiveDate>,

    /// Year of the record batch the transaction came from
    pub source_year: i32,
}

impl Transaction {
    /// Create a transaction with only the identifying attributes set.
    pub fn new(
        id: impl Into<String>,
        product_key: impl Into<String>,
        description: impl Into<String>,
        source_year: i32,
    ) -> Self {
        Self {
            id: id.into(),
            product_key: product_key.into(),
            description: description.into(),
            category: None,
            unit_price: None,
            quantity: 0,
            total_value: 0.0,
            supplier: None,
            region: None,
            purchase_date: None,
            source_year,
        }
    }

    /// Set unit price and quantity, deriving the total value.
    pub fn with_price(mut self, unit_price: f64, quantity: u64) -> Self {
        self.unit_price = Some(unit_price);
        self.quantity = quantity;
        self.total_value = unit_price * quantity as f64;
        self
    }

    /// Override the total value.
    pub const fn with_total_value(mut self, total_value: f64) -> Self {
        self.total_value = total_value;
        self
    }

    /// Set the supplier.
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Set the buyer region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the purchase date.
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }

    /// Unit price if it can enter a benchmark sample.
    pub fn scorable_price(&self) -> Option<f64> {
        self.unit_price.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Purchase year, falling back to the batch year for undated records.
    pub fn year(&self) -> i32 {
        self.purchase_date.map_or(self.source_year, |d| d.year())
    }

    /// Period of the purchase at the given granularity.
    ///
    /// Undated records only resolve at yearly granularity, through
    /// `source_year`.
    pub fn period(&self, granularity: Granularity) -> Option<Period> {
        match (self.purchase_date, granularity) {
            (Some(date), g) => Some(Period::from_date(date, g)),
            (None, Granularity::Year) => Some(Period::year(self.source_year)),
            (None, _) => None,
        }
    }

    /// Region grouping key.
    pub fn region_key(&self) -> RegionKey {
        AttributeKey::from_optional(self.region.as_deref())
    }

    /// Supplier grouping key.
    pub fn supplier_key(&self) -> SupplierKey {
        AttributeKey::from_optional(self.supplier.as_deref())
    }

    /// Trimmed category, if present and non-blank.
    pub fn category_key(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// First `words` whitespace-separated tokens of the description,
    /// upper-cased. Returns `None` for blank descriptions or `words == 0`.
    pub fn description_prefix(&self, words: usize) -> Option<String> {
        if words == 0 {
            return None;
        }
        let prefix = self
            .description
            .split_whitespace()
            .take(words)
            .map(str::to_uppercase)
            .collect::<Vec<_>>()
            .join(" ");
        (!prefix.is_empty()).then_some(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorable_price() {
        let tx = Transaction::new("1", "P", "DIPIRONA 500MG", 2021);
        assert_eq!(tx.scorable_price(), None);
        assert_eq!(tx.clone().with_price(0.0, 3).scorable_price(), None);
        assert_eq!(tx.clone().with_price(-2.0, 3).scorable_price(), None);
        assert_eq!(tx.clone().with_price(f64::NAN, 3).scorable_price(), None);
        assert_eq!(tx.with_price(2.5, 3).scorable_price(), Some(2.5));
    }

    #[test]
    fn test_period_fallback_to_source_year() {
        let tx = Transaction::new("1", "P", "X", 2020);
        assert_eq!(tx.period(Granularity::Year), Some(Period::year(2020)));
        assert_eq!(tx.period(Granularity::Month), None);

        let dated = tx.with_date(NaiveDate::from_ymd_opt(2021, 3, 9).unwrap());
        assert_eq!(dated.year(), 2021);
        assert_eq!(dated.period(Granularity::Month).unwrap().to_string(), "2021-03");
    }

    #[test]
    fn test_description_prefix() {
        let tx = Transaction::new("1", "P", "  amoxicilina 500 mg capsula", 2022);
        assert_eq!(tx.description_prefix(1).as_deref(), Some("AMOXICILINA"));
        assert_eq!(tx.description_prefix(2).as_deref(), Some("AMOXICILINA 500"));
        assert_eq!(tx.description_prefix(0), None);

        let blank = Transaction::new("2", "P", "   ", 2022);
        assert_eq!(blank.description_prefix(1), None);
    }

    #[test]
    fn test_missing_attributes_are_unknown() {
        let tx = Transaction::new("1", "P", "X", 2022).with_region(" ");
        assert!(!tx.region_key().is_known());
        assert!(!tx.supplier_key().is_known());
        assert_eq!(tx.category_key(), None);
    }
}
