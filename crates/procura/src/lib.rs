#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/procura-analytics/procura/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;

// Re-export main types from sub-crates
pub use procura_data as data;
pub use procura_output as output;
pub use procura_risk as risk;

pub use config::EngineConfig;
pub use engine::{AnalysisTables, EngineOutput, FeatureEngine, Partitioning};
pub use error::{EngineError, Result};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
