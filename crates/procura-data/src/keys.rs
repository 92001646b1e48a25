//! Grouping keys for optional attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used for records whose attribute is missing.
///
/// Angle brackets keep it apart from any trimmed source value spelled
/// `unknown`.
pub const UNKNOWN_LABEL: &str = "<unknown>";

/// Value of an optional grouping attribute such as region or supplier.
///
/// Missing or blank values collapse into the distinct [`AttributeKey::Unknown`]
/// group so a batch with partial attributes still aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeKey {
    /// A present, non-blank value (trimmed)
    Known(String),
    /// Missing or blank value
    Unknown,
}

impl AttributeKey {
    /// Key for an optional raw value.
    pub fn from_optional(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::Known(v.to_string()),
            _ => Self::Unknown,
        }
    }

    /// Whether the attribute was present.
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Label for tables and reports.
    pub fn label(&self) -> &str {
        match self {
            Self::Known(v) => v,
            Self::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Buyer region key.
pub type RegionKey = AttributeKey;

/// Supplier key.
pub type SupplierKey = AttributeKey;
