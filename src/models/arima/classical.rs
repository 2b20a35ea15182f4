//! Classical forecaster: ARIMA on the raw stock series with a stationarity
//! check and a fallback order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::Forecast;
use crate::error::{EngineError, Result};
use crate::models::arima::diff::{difference, integrate};
use crate::models::arima::model::{ARIMASpec, ARIMA};
use crate::models::traits::{ensure_signal, Forecaster, TrainingData};
use crate::utils::metrics::accuracy_score;
use crate::utils::stats::is_constant;
use crate::validation::adf_test;

/// Configuration of the classical forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassicalConfig {
    /// Order tried first.
    pub order: ARIMASpec,
    /// Order tried once when the first fit fails.
    pub fallback_order: ARIMASpec,
    /// Declared confidence.
    pub confidence: f64,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            order: ARIMASpec::new(1, 1, 1),
            fallback_order: ARIMASpec::new(1, 0, 0),
            confidence: 0.7,
        }
    }
}

/// Fitted state, also the exported blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClassicalState {
    /// Declared order of the attempt that succeeded.
    order: ARIMASpec,
    model: ARIMA,
    /// Series the stationarity differencing was applied to, if any.
    integration_base: Option<Vec<f64>>,
    accuracy: f64,
}

/// ARIMA over the stock series.
///
/// An augmented Dickey-Fuller test runs first; a non-stationary series is
/// differenced once before fitting and the forecast integrated once after.
/// That difference counts towards the order's `d`, so the total number of
/// differences never exceeds the declared one by more than the stationarity
/// step itself.
#[derive(Debug, Clone, Default)]
pub struct ClassicalForecaster {
    config: ClassicalConfig,
    state: Option<ClassicalState>,
}

impl ClassicalForecaster {
    /// Name used in weights, exclusions and state maps.
    pub const NAME: &'static str = "arima";

    /// Create a forecaster with the given configuration.
    pub fn new(config: ClassicalConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Declared order of the fitted model, which differs from the
    /// configured one after a fallback.
    pub fn fitted_order(&self) -> Option<ARIMASpec> {
        self.state.as_ref().map(|s| s.order)
    }

    /// True when the series was differenced for stationarity.
    pub fn was_differenced(&self) -> bool {
        self.state
            .as_ref()
            .map_or(false, |s| s.integration_base.is_some())
    }

    fn fit_order(&self, order: ARIMASpec, values: &[f64], pre_differenced: bool) -> Result<ARIMA> {
        let order = if pre_differenced {
            ARIMASpec::new(order.p, order.d.saturating_sub(1), order.q)
        } else {
            order
        };
        let model = ARIMA::fit(order, values)?;
        if model.forecast(1).iter().any(|v| !v.is_finite()) {
            return Err(EngineError::NumericInstability {
                model: Self::NAME.to_string(),
            });
        }
        Ok(model)
    }
}

impl Forecaster for ClassicalForecaster {
    fn fit(&mut self, data: &TrainingData<'_>) -> Result<()> {
        let stock = data.series.stock();
        ensure_signal(Self::NAME, stock)?;
        if is_constant(stock, 1e-12) {
            return Err(EngineError::model_fit(Self::NAME, "series has zero variance"));
        }

        let adf = adf_test(stock, None);
        debug!(
            model = Self::NAME,
            statistic = adf.statistic,
            stationary = adf.is_stationary,
            "stationarity test"
        );
        let (work, integration_base) = if adf.is_stationary {
            (stock.to_vec(), None)
        } else {
            (difference(stock, 1), Some(stock.to_vec()))
        };

        let pre_differenced = integration_base.is_some();
        let (order, model) = match self.fit_order(self.config.order, &work, pre_differenced) {
            Ok(model) => (self.config.order, model),
            Err(first) => {
                warn!(
                    model = Self::NAME,
                    order = %self.config.order,
                    fallback = %self.config.fallback_order,
                    error = %first,
                    "primary order failed, retrying with fallback"
                );
                let model = self
                    .fit_order(self.config.fallback_order, &work, pre_differenced)
                    .map_err(|second| EngineError::model_fit(Self::NAME, second.to_string()))?;
                (self.config.fallback_order, model)
            }
        };

        // One-step errors coincide on the differenced and level scales.
        let residuals = model.residuals();
        let targets = &stock[stock.len() - residuals.len()..];
        let fitted: Vec<f64> = targets.iter().zip(residuals).map(|(y, e)| y - e).collect();
        let accuracy = accuracy_score(targets, &fitted);

        self.state = Some(ClassicalState {
            order,
            model,
            integration_base,
            accuracy,
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(EngineError::FitRequired)?;
        let raw = state.model.forecast(horizon);
        let values = match &state.integration_base {
            Some(base) => integrate(&raw, base, 1),
            None => raw,
        };
        let forecast = Forecast::from_values(values);
        if !forecast.is_finite() {
            return Err(EngineError::NumericInstability {
                model: Self::NAME.to_string(),
            });
        }
        Ok(forecast)
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn confidence(&self) -> f64 {
        self.config.confidence
    }

    fn accuracy(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.accuracy)
    }

    fn export_state(&self) -> Result<Vec<u8>> {
        let state = self.state.as_ref().ok_or(EngineError::FitRequired)?;
        Ok(serde_json::to_vec(state)?)
    }

    fn import_state(&mut self, state: &[u8]) -> Result<()> {
        self.state = Some(serde_json::from_slice(state)?);
        Ok(())
    }
}
