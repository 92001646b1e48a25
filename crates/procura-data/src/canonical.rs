//! Canonical transaction table stored as delimited text.
//!
//! Headers follow [`crate::frame::columns`]. Empty cells and absent optional
//! headers both read as missing values.

use crate::error::{DataError, Result};
use crate::frame::lenient_date;
use crate::transaction::Transaction;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Row layout of the canonical CSV file.
#[derive(Debug, Deserialize)]
struct CanonicalRow {
    id: String,
    product_key: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    unit_price: Option<f64>,
    quantity: i64,
    #[serde(default)]
    total_value: Option<f64>,
    #[serde(default)]
    supplier: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    purchase_date: Option<String>,
    source_year: i32,
}

impl CanonicalRow {
    fn into_transaction(self, row: usize, unparsed_dates: &mut usize) -> Result<Transaction> {
        if self.quantity < 0 {
            return Err(DataError::NegativeQuantity {
                row,
                quantity: self.quantity,
            });
        }
        let quantity = self.quantity as u64;
        let total_value = self
            .total_value
            .or_else(|| self.unit_price.map(|p| p * quantity as f64))
            .unwrap_or(0.0);
        let purchase_date = self
            .purchase_date
            .as_deref()
            .and_then(|raw| lenient_date(raw, row, unparsed_dates));

        Ok(Transaction {
            id: self.id,
            product_key: self.product_key.trim().to_string(),
            description: self.description.unwrap_or_default(),
            category: self.category,
            unit_price: self.unit_price,
            quantity,
            total_value,
            supplier: self.supplier,
            region: self.region,
            purchase_date,
            source_year: self.source_year,
        })
    }
}

/// Read canonical transactions from any reader.
pub fn read_canonical<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Transaction>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut unparsed_dates = 0;
    let mut transactions = Vec::new();
    for (row, record) in csv_reader.deserialize::<CanonicalRow>().enumerate() {
        transactions.push(record?.into_transaction(row, &mut unparsed_dates)?);
    }
    tracing::info!(
        records = transactions.len(),
        unparsed_dates,
        "read canonical transactions"
    );
    Ok(transactions)
}

/// Read a canonical CSV file.
pub fn read_canonical_csv(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let transactions = read_canonical(file, delimiter)?;
    tracing::debug!(path = %path.display(), "canonical file closed");
    Ok(transactions)
}
