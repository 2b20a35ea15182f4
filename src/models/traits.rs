//! Forecaster trait defining the common interface for all sub-models.

use crate::core::{Forecast, ObservationSeries};
use crate::error::{EngineError, Result};
use crate::features::FeatureTable;

/// Everything a sub-model may train on.
///
/// Univariate models read `series`; feature-based models read `features`.
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    /// Validated raw history.
    pub series: &'a ObservationSeries,
    /// Engineered features aligned row-by-row with `series`.
    pub features: &'a FeatureTable,
}

impl<'a> TrainingData<'a> {
    /// Bundle a series with its feature table.
    pub fn new(series: &'a ObservationSeries, features: &'a FeatureTable) -> Self {
        Self { series, features }
    }
}

/// Common interface for all forecasting sub-models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster: Send + Sync {
    /// Fit the model to the training data.
    fn fit(&mut self, data: &TrainingData<'_>) -> Result<()>;

    /// Generate point predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Declared confidence used as the combination weight.
    fn confidence(&self) -> f64;

    /// In-sample accuracy in `[0, 1]`, available once fitted.
    fn accuracy(&self) -> Option<f64>;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.accuracy().is_some()
    }

    /// Serialize the fitted state to an opaque blob.
    fn export_state(&self) -> Result<Vec<u8>>;

    /// Restore a fitted state produced by [`export_state`](Self::export_state).
    fn import_state(&mut self, state: &[u8]) -> Result<()>;
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster>;

/// Reject series no model can learn from: non-finite or identically zero.
pub(crate) fn ensure_signal(model: &str, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(EngineError::model_fit(model, "empty series"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::model_fit(model, "series contains non-finite values"));
    }
    if values.iter().all(|v| *v == 0.0) {
        return Err(EngineError::model_fit(model, "series is identically zero"));
    }
    Ok(())
}

/// Model specification for the ensemble.
///
/// Contains a model factory function and its name.
///
/// # Example
///
/// ```
/// use anofox_retail::models::{ModelSpec, ClassicalForecaster, Forecaster};
///
/// let spec = ModelSpec::new("arima", || Box::new(ClassicalForecaster::default()));
/// let model = spec.create();
/// assert_eq!(model.name(), spec.name);
/// assert!(!model.is_fitted());
/// ```
pub struct ModelSpec {
    /// Display name of the model
    pub name: &'static str,
    /// Factory function to create a new instance
    factory: Box<dyn Fn() -> BoxedForecaster + Send + Sync>,
}

impl ModelSpec {
    /// Create a model spec with a simple factory.
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> BoxedForecaster + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(factory),
        }
    }

    /// Create a new model instance.
    pub fn create(&self) -> BoxedForecaster {
        (self.factory)()
    }
}

impl std::fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSpec").field("name", &self.name).finish()
    }
}

/// Ordered collection of model specifications.
#[derive(Debug)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Register a model specification.
    pub fn register(&mut self, spec: ModelSpec) {
        self.models.push(spec);
    }

    /// Get the number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate over model specifications.
    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }

    /// Look up a specification by name.
    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|s| s.name == name)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
