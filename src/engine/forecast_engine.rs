//! Ensemble stock forecasting engine.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ForecastConfig};
use crate::core::{ExcludedModel, ForecastResult, HistoricalObservation, ObservationSeries};
use crate::engine::pool::{BatchOutcome, WorkerPool};
use crate::error::{EngineError, Result};
use crate::features::ExternalFactors;
use crate::inventory::StockMetricsCalculator;
use crate::models::{default_registry, BoxedForecaster, ForecastCombiner, ModelRegistry, TrainingData};

/// Key of the history blob in an exported ensemble.
pub const SERIES_STATE_KEY: &str = "series";

/// One product of a batch forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    /// Product to forecast.
    pub product_id: String,
    /// Its history.
    pub observations: Vec<HistoricalObservation>,
    /// Days to forecast.
    pub horizon: usize,
    /// Optional external drivers.
    pub external: ExternalFactors,
}

impl ForecastRequest {
    /// Request without external factors.
    pub fn new(product_id: impl Into<String>, observations: Vec<HistoricalObservation>, horizon: usize) -> Self {
        Self {
            product_id: product_id.into(),
            observations,
            horizon,
            external: ExternalFactors::new(),
        }
    }
}

/// Fits every registered model on a product's history and combines their
/// forecasts.
///
/// # Example
///
/// ```
/// use anofox_retail::config::EngineConfig;
/// use anofox_retail::core::HistoricalObservation;
/// use anofox_retail::engine::ForecastEngine;
/// use anofox_retail::features::ExternalFactors;
/// use chrono::{Duration, NaiveDate};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let history: Vec<_> = (0..40)
///     .map(|i| HistoricalObservation::new("SKU-1", start + Duration::days(i), 100.0, 10.0))
///     .collect();
///
/// let engine = ForecastEngine::new(EngineConfig::default()).unwrap();
/// let result = engine
///     .forecast("SKU-1", &history, 14, &ExternalFactors::new())
///     .unwrap();
/// assert_eq!(result.point_estimates.len(), 14);
/// assert_eq!(result.stock_metrics.days_until_stockout, Some(10));
/// ```
#[derive(Debug)]
pub struct ForecastEngine {
    config: ForecastConfig,
    workers: usize,
    registry: ModelRegistry,
    pool: OnceLock<WorkerPool>,
}

impl ForecastEngine {
    /// Engine with the classical, sequence and tree models.
    ///
    /// # Errors
    /// `Config` when the configuration fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let f = &config.forecast;
        let registry = default_registry(f.classical, f.sequence, f.trees);
        Self::with_registry(config, registry)
    }

    /// Engine with a custom model registry.
    pub fn with_registry(config: EngineConfig, registry: ModelRegistry) -> Result<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(EngineError::Config("model registry is empty".into()));
        }
        Ok(Self {
            config: config.forecast,
            workers: config.workers,
            registry,
            pool: OnceLock::new(),
        })
    }

    /// Forecasting configuration.
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Registered models.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn calculator(&self) -> StockMetricsCalculator {
        StockMetricsCalculator::new(self.config.stock)
    }

    fn pool(&self) -> Result<&WorkerPool> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let built = WorkerPool::new(self.workers)?;
        Ok(self.pool.get_or_init(|| built))
    }

    /// Validate the history, engineer features and fit every model.
    ///
    /// Models that fail to fit are excluded with their reason.
    ///
    /// # Errors
    /// * Input validation errors of [`ObservationSeries::from_observations`].
    /// * `InsufficientData` for a history shorter than the feature lags allow.
    /// * `NoModelAvailable` when every model failed.
    pub fn fit(
        &self,
        product_id: &str,
        observations: &[HistoricalObservation],
        external: &ExternalFactors,
    ) -> Result<FittedEnsemble> {
        if observations.is_empty() {
            return Err(EngineError::InsufficientData {
                needed: self.config.features.min_observations(),
                got: 0,
            });
        }
        let series = ObservationSeries::from_observations(product_id, observations)?;
        let features = self.config.features.transform(&series, external)?;
        let data = TrainingData::new(&series, &features);

        let mut models: Vec<BoxedForecaster> = Vec::with_capacity(self.registry.len());
        let mut excluded = Vec::new();
        for spec in self.registry.iter() {
            let mut model = spec.create();
            match model.fit(&data) {
                Ok(()) => {
                    debug!(product_id, model = spec.name, accuracy = ?model.accuracy(), "model fitted");
                    models.push(model);
                }
                Err(err) => {
                    warn!(product_id, model = spec.name, error = %err, "model excluded");
                    excluded.push(ExcludedModel {
                        model: spec.name.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if models.is_empty() {
            return Err(EngineError::NoModelAvailable {
                excluded: excluded.into_iter().map(|e| e.model).collect(),
            });
        }
        info!(product_id, fitted = models.len(), excluded = excluded.len(), "ensemble fitted");

        Ok(FittedEnsemble {
            series,
            models,
            excluded,
            calculator: self.calculator(),
        })
    }

    /// Fit and forecast in one call.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero horizon, before any fitting, plus the
    /// errors of [`fit`](Self::fit) and [`FittedEnsemble::forecast`].
    pub fn forecast(
        &self,
        product_id: &str,
        observations: &[HistoricalObservation],
        horizon: usize,
        external: &ExternalFactors,
    ) -> Result<ForecastResult> {
        check_horizon(horizon)?;
        self.fit(product_id, observations, external)?.forecast(horizon)
    }

    /// Forecast many products on the worker pool.
    ///
    /// Outcomes follow request order; one product's failure or panic does
    /// not affect the others.
    pub fn forecast_batch(&self, requests: Vec<ForecastRequest>) -> Result<Vec<BatchOutcome<String, ForecastResult>>> {
        let pool = self.pool()?;
        Ok(pool.run(
            requests,
            |r| r.product_id.clone(),
            |r| self.forecast(&r.product_id, &r.observations, r.horizon, &r.external),
        ))
    }

    /// Restore an ensemble exported with [`FittedEnsemble::export_state`].
    ///
    /// Registered models without a blob are reported as excluded.
    ///
    /// # Errors
    /// `Serialization` when the history blob is missing or a blob is
    /// malformed; `NoModelAvailable` when no model could be restored.
    pub fn import_state(&self, state: &BTreeMap<String, Vec<u8>>) -> Result<FittedEnsemble> {
        let blob = state
            .get(SERIES_STATE_KEY)
            .ok_or_else(|| EngineError::Serialization(format!("missing '{SERIES_STATE_KEY}' state")))?;
        let series: ObservationSeries = serde_json::from_slice(blob)?;

        let mut models: Vec<BoxedForecaster> = Vec::new();
        let mut excluded = Vec::new();
        for spec in self.registry.iter() {
            match state.get(spec.name) {
                Some(blob) => {
                    let mut model = spec.create();
                    model.import_state(blob)?;
                    models.push(model);
                }
                None => excluded.push(ExcludedModel {
                    model: spec.name.to_string(),
                    reason: "no exported state".to_string(),
                }),
            }
        }

        if models.is_empty() {
            return Err(EngineError::NoModelAvailable {
                excluded: excluded.into_iter().map(|e| e.model).collect(),
            });
        }
        Ok(FittedEnsemble {
            series,
            models,
            excluded,
            calculator: self.calculator(),
        })
    }
}

fn check_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(EngineError::InvalidParameter("horizon must be at least 1 day".into()));
    }
    Ok(())
}

/// Fitted models of one product, reusable for any horizon.
pub struct FittedEnsemble {
    series: ObservationSeries,
    models: Vec<BoxedForecaster>,
    excluded: Vec<ExcludedModel>,
    calculator: StockMetricsCalculator,
}

impl std::fmt::Debug for FittedEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedEnsemble")
            .field("product_id", &self.series.product_id())
            .field("models", &self.model_names())
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl FittedEnsemble {
    /// Product the ensemble was fitted for.
    pub fn product_id(&self) -> &str {
        self.series.product_id()
    }

    /// Validated history.
    pub fn series(&self) -> &ObservationSeries {
        &self.series
    }

    /// Names of the fitted models.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Models excluded while fitting.
    pub fn excluded(&self) -> &[ExcludedModel] {
        &self.excluded
    }

    /// Combined forecast with intervals and stock metrics.
    ///
    /// Models whose prediction fails are excluded for this call only.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero horizon; `NoModelAvailable` when no
    /// model produced a forecast.
    pub fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        check_horizon(horizon)?;
        let product_id = self.series.product_id();

        let mut forecasts = BTreeMap::new();
        let mut confidences = BTreeMap::new();
        let mut accuracies = BTreeMap::new();
        let mut excluded = self.excluded.clone();

        for model in &self.models {
            let name = model.name().to_string();
            let outcome = model.predict(horizon).and_then(|f| {
                if f.horizon() != horizon {
                    Err(EngineError::DimensionMismatch {
                        expected: horizon,
                        got: f.horizon(),
                    })
                } else if !f.is_finite() {
                    Err(EngineError::NumericInstability { model: name.clone() })
                } else {
                    Ok(f)
                }
            });
            match outcome {
                Ok(forecast) => {
                    confidences.insert(name.clone(), model.confidence());
                    accuracies.insert(name.clone(), model.accuracy().unwrap_or(0.0));
                    forecasts.insert(name, forecast.into_values());
                }
                Err(err) => {
                    warn!(product_id, model = %name, error = %err, "prediction excluded");
                    excluded.push(ExcludedModel {
                        model: name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if forecasts.is_empty() {
            return Err(EngineError::NoModelAvailable {
                excluded: excluded.into_iter().map(|e| e.model).collect(),
            });
        }

        let combiner = ForecastCombiner::new();
        let combination = combiner.combine(&forecasts, &confidences)?;
        let accuracy = combiner.accuracy_estimate(&combination.weights, &accuracies);
        let intervals = self.calculator.intervals(&self.series, &combination.values);
        let metrics = self.calculator.metrics(&self.series, &combination.values);

        ForecastResult::new(
            product_id,
            horizon,
            combination.values,
            intervals,
            combination.weights,
            accuracy,
            excluded,
            metrics,
        )
    }

    /// Opaque per-model blobs plus the history, keyed by model name.
    pub fn export_state(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut state = BTreeMap::new();
        state.insert(SERIES_STATE_KEY.to_string(), serde_json::to_vec(&self.series)?);
        for model in &self.models {
            state.insert(model.name().to_string(), model.export_state()?);
        }
        Ok(state)
    }
}
