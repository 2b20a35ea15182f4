//! Forecast containers: raw model output and the validated ensemble result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::inventory::StockMetrics;

/// Point predictions of a single sub-model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    point: Vec<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { point: values }
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn values(&self) -> &[f64] {
        &self.point
    }

    /// Consume the forecast, returning its point predictions.
    pub fn into_values(self) -> Vec<f64> {
        self.point
    }

    /// True when every prediction is finite.
    pub fn is_finite(&self) -> bool {
        self.point.iter().all(|v| v.is_finite())
    }
}

/// Lower and upper bound around one forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

/// A sub-model left out of the ensemble and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedModel {
    /// Model name.
    pub model: String,
    /// Failure description.
    pub reason: String,
}

/// Combined forecast for one product.
///
/// Invariants, checked by [`ForecastResult::new`]:
/// * one estimate and one interval per horizon step;
/// * `lower <= point <= upper` at every step;
/// * model weights sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Product the forecast belongs to.
    pub product_id: String,
    /// Combined point forecast per day.
    pub point_estimates: Vec<f64>,
    /// Interval per day.
    pub confidence_intervals: Vec<ConfidenceInterval>,
    /// Normalized weight of every model that produced output.
    pub contributing_model_weights: BTreeMap<String, f64>,
    /// Weighted in-sample accuracy of the contributing models, in `[0, 1]`.
    pub accuracy_estimate: f64,
    /// Models that failed to fit or predict.
    pub excluded_models: Vec<ExcludedModel>,
    /// Inventory figures derived from the forecast.
    pub stock_metrics: StockMetrics,
}

impl ForecastResult {
    /// Assemble a result, validating its invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_id: impl Into<String>,
        horizon: usize,
        point_estimates: Vec<f64>,
        confidence_intervals: Vec<ConfidenceInterval>,
        contributing_model_weights: BTreeMap<String, f64>,
        accuracy_estimate: f64,
        excluded_models: Vec<ExcludedModel>,
        stock_metrics: StockMetrics,
    ) -> Result<Self> {
        if point_estimates.len() != horizon {
            return Err(EngineError::DimensionMismatch {
                expected: horizon,
                got: point_estimates.len(),
            });
        }
        if confidence_intervals.len() != horizon {
            return Err(EngineError::DimensionMismatch {
                expected: horizon,
                got: confidence_intervals.len(),
            });
        }

        for (step, (point, ci)) in point_estimates.iter().zip(&confidence_intervals).enumerate() {
            if !point.is_finite() || !(ci.lower <= *point && *point <= ci.upper) {
                return Err(EngineError::ComputationError(format!(
                    "interval [{}, {}] does not contain estimate {} at step {}",
                    ci.lower,
                    ci.upper,
                    point,
                    step + 1
                )));
            }
        }

        let weight_sum: f64 = contributing_model_weights.values().sum();
        if contributing_model_weights.is_empty() || (weight_sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::ComputationError(format!(
                "model weights sum to {weight_sum}, expected 1"
            )));
        }

        Ok(Self {
            product_id: product_id.into(),
            point_estimates,
            confidence_intervals,
            contributing_model_weights,
            accuracy_estimate: accuracy_estimate.clamp(0.0, 1.0),
            excluded_models,
            stock_metrics,
        })
    }

    /// Forecast horizon in days.
    pub fn horizon(&self) -> usize {
        self.point_estimates.len()
    }
}
