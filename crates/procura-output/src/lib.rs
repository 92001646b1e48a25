#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/procura-analytics/procura/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod radar;
pub mod records;
pub mod summary;
pub mod tables;

pub use export::{ExportError, ExportFormat, Exporter};
pub use radar::{OpportunityRadar, RadarEntry};
pub use records::{
    BenchmarkRecord, ConcentrationRecord, DemandRecord, EnrichedRecord, PriorityRecord,
    TabularRecord,
};
pub use summary::RunSummary;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
