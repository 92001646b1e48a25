#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/procura-analytics/procura/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod assemble;
pub mod benchmark;
pub mod concentration;
pub mod demand;
pub mod deviation;
pub mod error;
pub mod priority;
pub mod stats;

// Re-export main types
pub use assemble::{AssemblyError, ConcentrationMarker, EnrichedTransaction, FeatureAssembler};
pub use benchmark::{
    BenchmarkConfig, BenchmarkError, BenchmarkEstimator, BenchmarkGroup, BenchmarkKey,
    BenchmarkSamples, BenchmarkTable,
};
pub use concentration::{
    ConcentrationAnalyzer, ConcentrationConfig, ConcentrationError, ConcentrationFlag,
    ConcentrationTable, SupplierLedger,
};
pub use demand::{DemandAnalyzer, DemandConfig, DemandError, DemandLedger, DemandTable, DemandTier};
pub use deviation::{
    DeviationConfig, DeviationError, DeviationScorer, PriceAssessment, PriceScores, RiskTier,
};
pub use error::{Result, RiskError};
pub use priority::{PriorityConfig, PriorityError, PriorityIndexer, PriorityTable};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
