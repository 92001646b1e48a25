//! Engine configuration.
//!
//! Every analyzer takes its own section; missing sections and fields fall
//! back to their defaults, so `{}` is a valid configuration.

use crate::error::Result;
use procura_risk::{
    BenchmarkConfig, ConcentrationConfig, DemandConfig, DeviationConfig, PriorityConfig,
    RiskError,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the feature engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Benchmark estimation
    pub benchmark: BenchmarkConfig,
    /// Deviation scoring
    pub deviation: DeviationConfig,
    /// Demand stability
    pub demand: DemandConfig,
    /// Supplier concentration
    pub concentration: ConcentrationConfig,
    /// Priority index
    pub priority: PriorityConfig,
}

impl EngineConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section.
    pub fn validate(&self) -> std::result::Result<(), RiskError> {
        self.benchmark.validate()?;
        self.deviation.validate()?;
        self.demand.validate()?;
        self.concentration.validate()?;
        self.priority.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use procura_risk::benchmark::{BenchmarkError, BenchmarkWindow};
    use procura_risk::concentration::ConcentrationFormula;
    use procura_risk::deviation::ClampPolicy;

    #[test]
    fn test_empty_json_is_default() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let json = r#"{
            "benchmark": { "min_samples": 5, "window": "year" },
            "deviation": { "clamp": { "mode": "winsorized", "percentile": 0.99, "min_magnitude": 6.0 } },
            "concentration": { "formula": "herfindahl" }
        }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.benchmark.min_samples, 5);
        assert_eq!(config.benchmark.window, BenchmarkWindow::Year);
        assert_eq!(config.benchmark.mad_scale, 1.4826);
        assert!(matches!(
            config.deviation.clamp,
            ClampPolicy::Winsorized { .. }
        ));
        assert_eq!(
            config.concentration.formula,
            ConcentrationFormula::Herfindahl
        );
        assert_eq!(config.concentration.high_threshold, 0.8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "benchmark": { "min_samples": 0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Risk(RiskError::Benchmark(BenchmarkError::InvalidMinSamples(0)))
        ));

        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let json = EngineConfig::default().to_json_string().unwrap();
        assert_eq!(
            EngineConfig::from_json_str(&json).unwrap(),
            EngineConfig::default()
        );
    }
}
