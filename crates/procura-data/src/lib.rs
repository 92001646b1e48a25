#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/procura-analytics/procura/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod canonical;
pub mod error;
pub mod frame;
pub mod keys;
pub mod period;
pub mod transaction;

pub use error::{DataError, Result};
pub use keys::{AttributeKey, RegionKey, SupplierKey};
pub use period::{Granularity, Horizon, Period};
pub use transaction::Transaction;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
