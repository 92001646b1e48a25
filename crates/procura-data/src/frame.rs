//! Canonical transaction table as a polars `DataFrame`.
//!
//! The ingestion stage hands over one row per purchase line using the
//! column names in [`columns`]. Optional columns may be absent entirely;
//! their values then map to the "unknown" groupings downstream.

use crate::error::{DataError, Result};
use crate::transaction::Transaction;
use chrono::NaiveDate;
use polars::prelude::*;

/// Canonical column names.
pub mod columns {
    /// Record identifier (required)
    pub const ID: &str = "id";
    /// Normalized product key (required)
    pub const PRODUCT_KEY: &str = "product_key";
    /// Product description
    pub const DESCRIPTION: &str = "description";
    /// Product category
    pub const CATEGORY: &str = "category";
    /// Unit price
    pub const UNIT_PRICE: &str = "unit_price";
    /// Quantity (required)
    pub const QUANTITY: &str = "quantity";
    /// Total line value
    pub const TOTAL_VALUE: &str = "total_value";
    /// Supplier identifier
    pub const SUPPLIER: &str = "supplier";
    /// Buyer region
    pub const REGION: &str = "region";
    /// Purchase date (`YYYY-MM-DD` or a polars `Date`)
    pub const PURCHASE_DATE: &str = "purchase_date";
    /// Source batch year (required)
    pub const SOURCE_YEAR: &str = "source_year";

    /// Columns that must be present.
    pub const REQUIRED: &[&str] = &[ID, PRODUCT_KEY, QUANTITY, SOURCE_YEAR];
}

/// Parse a canonical purchase date.
pub(crate) fn parse_date(raw: &str, row: usize) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    // Datetime columns cast to strings carry a time component.
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| DataError::InvalidDate {
            row,
            value: raw.to_string(),
        })
}

/// Parse a present date cell, degrading unparsable values to a missing date.
///
/// Each degraded cell is logged and counted in `unparsed`.
pub(crate) fn lenient_date(raw: &str, row: usize, unparsed: &mut usize) -> Option<NaiveDate> {
    match parse_date(raw, row) {
        Ok(date) => date,
        Err(e) => {
            tracing::warn!(row, value = raw.trim(), "{e}; purchase date treated as missing");
            *unparsed += 1;
            None
        }
    }
}

fn required(df: &DataFrame, name: &str) -> Result<Column> {
    df.column(name)
        .cloned()
        .map_err(|_| DataError::MissingColumn(name.to_string()))
}

fn optional_strings(df: &DataFrame, name: &str) -> Result<Option<StringChunked>> {
    match df.column(name) {
        Ok(column) => Ok(Some(column.cast(&DataType::String)?.str()?.clone())),
        Err(_) => Ok(None),
    }
}

fn optional_floats(df: &DataFrame, name: &str) -> Result<Option<Float64Chunked>> {
    match df.column(name) {
        Ok(column) => Ok(Some(column.cast(&DataType::Float64)?.f64()?.clone())),
        Err(_) => Ok(None),
    }
}

/// Convert a canonical table into transactions, preserving row order.
///
/// # Errors
/// Fails when a required column is missing, a required value is null, or a
/// quantity is negative. Unparsable dates read as missing.
pub fn transactions_from_frame(df: &DataFrame) -> Result<Vec<Transaction>> {
    let ids = required(df, columns::ID)?.cast(&DataType::String)?;
    let ids = ids.str()?;
    let products = required(df, columns::PRODUCT_KEY)?.cast(&DataType::String)?;
    let products = products.str()?;
    let quantities = required(df, columns::QUANTITY)?.cast(&DataType::Int64)?;
    let quantities = quantities.i64()?;
    let years = required(df, columns::SOURCE_YEAR)?.cast(&DataType::Int32)?;
    let years = years.i32()?;

    let descriptions = optional_strings(df, columns::DESCRIPTION)?;
    let categories = optional_strings(df, columns::CATEGORY)?;
    let suppliers = optional_strings(df, columns::SUPPLIER)?;
    let regions = optional_strings(df, columns::REGION)?;
    let dates = optional_strings(df, columns::PURCHASE_DATE)?;
    let prices = optional_floats(df, columns::UNIT_PRICE)?;
    let totals = optional_floats(df, columns::TOTAL_VALUE)?;

    let missing = |column: &str, row: usize| DataError::MissingValue {
        column: column.to_string(),
        row,
    };

    let mut unparsed_dates = 0;
    let mut transactions = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let id = ids.get(row).ok_or_else(|| missing(columns::ID, row))?;
        let product = products
            .get(row)
            .ok_or_else(|| missing(columns::PRODUCT_KEY, row))?;
        let quantity = quantities
            .get(row)
            .ok_or_else(|| missing(columns::QUANTITY, row))?;
        if quantity < 0 {
            return Err(DataError::NegativeQuantity { row, quantity });
        }
        let source_year = years
            .get(row)
            .ok_or_else(|| missing(columns::SOURCE_YEAR, row))?;

        let text = |chunk: &Option<StringChunked>| {
            chunk
                .as_ref()
                .and_then(|c| c.get(row))
                .map(str::to_string)
        };

        let unit_price = prices.as_ref().and_then(|c| c.get(row));
        let total_value = totals
            .as_ref()
            .and_then(|c| c.get(row))
            .or_else(|| unit_price.map(|p| p * quantity as f64))
            .unwrap_or(0.0);
        let purchase_date = dates
            .as_ref()
            .and_then(|c| c.get(row))
            .and_then(|raw| lenient_date(raw, row, &mut unparsed_dates));

        transactions.push(Transaction {
            id: id.to_string(),
            product_key: product.trim().to_string(),
            description: text(&descriptions).unwrap_or_default(),
            category: text(&categories),
            unit_price,
            quantity: quantity as u64,
            total_value,
            supplier: text(&suppliers),
            region: text(&regions),
            purchase_date,
            source_year,
        });
    }

    tracing::debug!(
        rows = transactions.len(),
        unparsed_dates,
        "read canonical transaction frame"
    );
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_columns_may_be_absent() {
        let df = df!(
            "id" => ["a", "b"],
            "product_key" => ["P1", " P2 "],
            "quantity" => [10i64, 0],
            "source_year" => [2021i32, 2022],
            "unit_price" => [Some(2.5), None],
        )
        .unwrap();

        let txs = transactions_from_frame(&df).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].total_value, 25.0);
        assert_eq!(txs[1].product_key, "P2");
        assert_eq!(txs[1].unit_price, None);
        assert_eq!(txs[1].total_value, 0.0);
        assert!(txs[0].region.is_none());
        assert!(txs[0].purchase_date.is_none());
    }

    #[test]
    fn test_dates_and_text_columns() {
        let df = df!(
            "id" => ["a"],
            "product_key" => ["P1"],
            "description" => ["DIPIRONA 500MG"],
            "quantity" => [4i64],
            "total_value" => [40.0],
            "region" => ["MG"],
            "supplier" => ["S1"],
            "purchase_date" => ["2022-07-14"],
            "source_year" => [2022i32],
        )
        .unwrap();

        let txs = transactions_from_frame(&df).unwrap();
        assert_eq!(txs[0].purchase_date, NaiveDate::from_ymd_opt(2022, 7, 14));
        assert_eq!(txs[0].region.as_deref(), Some("MG"));
        assert_eq!(txs[0].total_value, 40.0);
    }

    #[test]
    fn test_missing_required_column() {
        let df = df!("id" => ["a"], "quantity" => [1i64], "source_year" => [2020i32]).unwrap();
        let err = transactions_from_frame(&df).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(c) if c == "product_key"));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let df = df!(
            "id" => ["a"],
            "product_key" => ["P"],
            "quantity" => [-3i64],
            "source_year" => [2020i32],
        )
        .unwrap();
        assert!(matches!(
            transactions_from_frame(&df),
            Err(DataError::NegativeQuantity { row: 0, quantity: -3 })
        ));
    }

    #[test]
    fn test_unparsable_date_keeps_row() {
        let df = df!(
            "id" => ["a", "b", "c"],
            "product_key" => ["P", "P", "Q"],
            "quantity" => [1i64, 2, 3],
            "purchase_date" => [Some("2023-01-05"), Some("05/01/2023"), None],
            "source_year" => [2023i32, 2023, 2022],
        )
        .unwrap();

        let txs = transactions_from_frame(&df).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].purchase_date, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert_eq!(txs[1].purchase_date, None);
        assert_eq!(txs[1].quantity, 2);
        assert_eq!(txs[2].purchase_date, None);
    }

    #[test]
    fn test_lenient_date_counts_unparsed() {
        let mut unparsed = 0;
        assert_eq!(
            lenient_date("2022-03-01", 0, &mut unparsed),
            NaiveDate::from_ymd_opt(2022, 3, 1)
        );
        assert_eq!(lenient_date("  ", 1, &mut unparsed), None);
        assert_eq!(unparsed, 0);
        assert_eq!(lenient_date("2022-13-40", 2, &mut unparsed), None);
        assert_eq!(unparsed, 1);
    }

    #[test]
    fn test_parse_date_with_time_component() {
        assert_eq!(
            parse_date("2023-01-05 00:00:00", 0).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(parse_date("", 0).unwrap(), None);
        assert!(parse_date("05/01/2023", 3).is_err());
    }
}
