//! Engine configuration.
//!
//! Every section has defaults, so an empty TOML document is a valid
//! configuration:
//!
//! ```
//! use anofox_retail::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     workers = 4
//!
//!     [forecast.trees]
//!     n_estimators = 50
//!
//!     [recommend]
//!     neighbors = 5
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.workers, 4);
//! assert_eq!(config.forecast.trees.n_estimators, 50);
//! assert_eq!(config.forecast.trees.boosting_rounds, 100);
//! assert_eq!(config.recommend.neighbors, 5);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::features::FeatureEngineer;
use crate::inventory::StockPolicy;
use crate::models::{ClassicalConfig, SequenceConfig, TreeConfig};
use crate::recommend::{Aggregation, HybridWeights};

/// Settings of the forecasting engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Feature windows and lags.
    pub features: FeatureEngineer,
    /// Classical (ARIMA) model.
    pub classical: ClassicalConfig,
    /// Sequence (echo-state) model.
    pub sequence: SequenceConfig,
    /// Tree ensemble model.
    pub trees: TreeConfig,
    /// Interval and reorder policy.
    pub stock: StockPolicy,
}

/// Settings of the recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Similar users consulted per recommendation.
    pub neighbors: usize,
    /// Vocabulary cap of the TF-IDF index.
    pub max_features: usize,
    /// Merge rule for repeated (user, product) records.
    pub aggregation: Aggregation,
    /// Hybrid blend weights.
    pub weights: HybridWeights,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            neighbors: 10,
            max_features: 1000,
            aggregation: Aggregation::Mean,
            weights: HybridWeights::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Forecasting engine.
    pub forecast: ForecastConfig,
    /// Recommendation engine.
    pub recommend: RecommendConfig,
    /// Batch worker threads; 0 lets rayon pick one per core.
    pub workers: usize,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// `Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let f = &self.forecast;

        if f.features.lags.is_empty() || f.features.lags.contains(&0) {
            return invalid("forecast.features.lags must be non-empty and positive");
        }
        if f.features.rolling_windows.is_empty() || f.features.rolling_windows.contains(&0) {
            return invalid("forecast.features.rolling_windows must be non-empty and positive");
        }

        for (name, confidence) in [
            ("forecast.classical.confidence", f.classical.confidence),
            ("forecast.sequence.confidence", f.sequence.confidence),
            ("forecast.trees.confidence", f.trees.confidence),
        ] {
            if !(confidence.is_finite() && confidence > 0.0 && confidence <= 1.0) {
                return invalid(&format!("{name} must be in (0, 1], got {confidence}"));
            }
        }

        let s = &f.sequence;
        if s.window < 2 || s.units == 0 {
            return invalid("forecast.sequence needs window >= 2 and units >= 1");
        }
        if !(s.leak_rate > 0.0 && s.leak_rate <= 1.0) {
            return invalid("forecast.sequence.leak_rate must be in (0, 1]");
        }
        if !(s.ridge_penalty.is_finite() && s.ridge_penalty > 0.0) {
            return invalid("forecast.sequence.ridge_penalty must be positive");
        }
        if !(s.recurrent_norm.is_finite() && s.recurrent_norm > 0.0 && s.recurrent_norm < 1.0) {
            return invalid("forecast.sequence.recurrent_norm must be in (0, 1)");
        }

        let t = &f.trees;
        if t.n_estimators == 0 || t.max_depth == 0 {
            return invalid("forecast.trees needs n_estimators >= 1 and max_depth >= 1");
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return invalid("forecast.trees.learning_rate must be positive");
        }
        if t.forest_weight < 0.0
            || t.boosting_weight < 0.0
            || (t.forest_weight + t.boosting_weight - 1.0).abs() > 1e-9
        {
            return invalid("forecast.trees weights must be non-negative and sum to 1");
        }

        f.stock
            .validate()
            .map_err(|e| EngineError::Config(format!("forecast.stock: {e}")))?;

        let r = &self.recommend;
        if r.neighbors == 0 || r.max_features == 0 {
            return invalid("recommend needs neighbors >= 1 and max_features >= 1");
        }
        let w = &r.weights;
        if !(w.collaborative.is_finite() && w.content.is_finite())
            || w.collaborative < 0.0
            || w.content < 0.0
        {
            return invalid("recommend.weights must be non-negative numbers");
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(EngineError::Config(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.forecast.sequence.window, 30);
        assert_eq!(config.forecast.stock.z_score, 1.96);
        assert_eq!(config.recommend.weights.collaborative, 0.7);
    }

    #[test]
    fn nested_sections_override_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            [forecast.classical]
            confidence = 0.5
            order = { p = 2, d = 0, q = 1 }

            [forecast.stock]
            lead_time_days = 14.0

            [recommend]
            aggregation = "sum"
            "#,
        )
        .unwrap();
        assert_eq!(config.forecast.classical.confidence, 0.5);
        assert_eq!(config.forecast.classical.order.p, 2);
        assert_eq!(config.forecast.stock.lead_time_days, 14.0);
        assert_eq!(config.forecast.stock.safety_stock_days, 3.0);
        assert_eq!(config.recommend.aggregation, Aggregation::Sum);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("[forecast.trees]\nforest_weight = 0.9\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = EngineConfig::from_toml_str("[forecast.sequence]\nconfidence = 1.5\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = EngineConfig::from_toml_str("[forecast.stock]\nvolatility_window = 0\n").unwrap_err();
        assert!(err.to_string().contains("forecast.stock"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = EngineConfig::from_toml_str("workers = \"many\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
