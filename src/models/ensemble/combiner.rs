//! Confidence-weighted combination of sub-model forecasts.

use std::collections::BTreeMap;

use crate::error::{EngineError, Result};

/// Output of [`ForecastCombiner::combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Weighted sum per step.
    pub values: Vec<f64>,
    /// Normalized weight per contributing model; sums to one.
    pub weights: BTreeMap<String, f64>,
}

/// Merges the forecasts of the models that produced output.
///
/// Each model's weight is its declared confidence divided by the total
/// confidence of the contributing models. Models without output do not take
/// part in the normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastCombiner;

impl ForecastCombiner {
    /// Create a combiner.
    pub fn new() -> Self {
        Self
    }

    /// Combine forecasts keyed by model name.
    ///
    /// A model missing from `confidences` gets confidence zero; if every
    /// contributing confidence is zero the models are weighted equally.
    ///
    /// # Errors
    /// * `NoModelAvailable` when `forecasts` is empty.
    /// * `DimensionMismatch` when forecasts differ in length.
    pub fn combine(
        &self,
        forecasts: &BTreeMap<String, Vec<f64>>,
        confidences: &BTreeMap<String, f64>,
    ) -> Result<Combination> {
        let Some(horizon) = forecasts.values().next().map(Vec::len) else {
            return Err(EngineError::NoModelAvailable {
                excluded: Vec::new(),
            });
        };
        if let Some(bad) = forecasts.values().find(|v| v.len() != horizon) {
            return Err(EngineError::DimensionMismatch {
                expected: horizon,
                got: bad.len(),
            });
        }

        let raw: BTreeMap<String, f64> = forecasts
            .keys()
            .map(|name| {
                let c = confidences.get(name).copied().unwrap_or(0.0);
                (name.clone(), if c.is_finite() { c.max(0.0) } else { 0.0 })
            })
            .collect();
        let total: f64 = raw.values().sum();
        let weights: BTreeMap<String, f64> = if total > 0.0 {
            raw.into_iter().map(|(k, c)| (k, c / total)).collect()
        } else {
            let equal = 1.0 / forecasts.len() as f64;
            raw.into_keys().map(|k| (k, equal)).collect()
        };

        let mut values = vec![0.0; horizon];
        for (name, forecast) in forecasts {
            let w = weights[name];
            for (acc, v) in values.iter_mut().zip(forecast) {
                *acc += w * v;
            }
        }

        Ok(Combination { values, weights })
    }

    /// Weighted mean of per-model accuracies, in `[0, 1]`.
    ///
    /// Models without an accuracy entry count as zero.
    pub fn accuracy_estimate(&self, weights: &BTreeMap<String, f64>, accuracies: &BTreeMap<String, f64>) -> f64 {
        weights
            .iter()
            .map(|(name, w)| w * accuracies.get(name).copied().unwrap_or(0.0))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn map<T: Clone>(pairs: &[(&str, T)]) -> BTreeMap<String, T> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn weights_are_normalized_confidences() {
        let forecasts = map(&[("arima", vec![10.0, 10.0]), ("trees", vec![20.0, 30.0])]);
        let confidences = map(&[("arima", 0.7), ("sequence", 0.85), ("trees", 0.8)]);
        let combo = ForecastCombiner::new().combine(&forecasts, &confidences).unwrap();

        assert_eq!(combo.weights.len(), 2);
        assert_relative_eq!(combo.weights["arima"], 0.7 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(combo.weights["trees"], 0.8 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(combo.weights.values().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(combo.values[0], (7.0 + 16.0) / 1.5, epsilon = 1e-12);
        assert_relative_eq!(combo.values[1], (7.0 + 24.0) / 1.5, epsilon = 1e-12);
    }

    #[test]
    fn single_model_gets_full_weight() {
        let forecasts = map(&[("sequence", vec![5.0, 6.0, 7.0])]);
        let confidences = map(&[("sequence", 0.85)]);
        let combo = ForecastCombiner::new().combine(&forecasts, &confidences).unwrap();
        assert_eq!(combo.values, vec![5.0, 6.0, 7.0]);
        assert_eq!(combo.weights["sequence"], 1.0);
    }

    #[test]
    fn empty_input_means_no_model() {
        let err = ForecastCombiner::new()
            .combine(&BTreeMap::new(), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::NoModelAvailable { .. }));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let forecasts = map(&[("a", vec![1.0, 2.0]), ("b", vec![1.0])]);
        let confidences = map(&[("a", 0.5), ("b", 0.5)]);
        let err = ForecastCombiner::new().combine(&forecasts, &confidences).unwrap_err();
        assert_eq!(err, EngineError::DimensionMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn zero_confidences_fall_back_to_equal_weights() {
        let forecasts = map(&[("a", vec![2.0]), ("b", vec![4.0])]);
        let combo = ForecastCombiner::new().combine(&forecasts, &BTreeMap::new()).unwrap();
        assert_relative_eq!(combo.values[0], 3.0);
    }

    #[test]
    fn accuracy_is_weighted() {
        let weights = map(&[("a", 0.25), ("b", 0.75)]);
        let accuracies = map(&[("a", 0.8), ("b", 0.4)]);
        assert_relative_eq!(
            ForecastCombiner::new().accuracy_estimate(&weights, &accuracies),
            0.5,
            epsilon = 1e-12
        );
    }
}
