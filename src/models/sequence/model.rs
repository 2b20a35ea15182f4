//! Sequence forecaster: echo-state network over fixed-length windows of the
//! normalized stock series.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Forecast;
use crate::error::{EngineError, Result};
use crate::models::sequence::reservoir::Reservoir;
use crate::models::traits::{ensure_signal, Forecaster, TrainingData};
use crate::transform::{normalize, ScaleParams};
use crate::utils::metrics::accuracy_score;
use crate::utils::ols::{ridge_fit, RidgeFit};

/// Configuration of the sequence forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Window length fed to the reservoir.
    pub window: usize,
    /// Reservoir size.
    pub units: usize,
    /// Infinity norm the recurrent matrix is scaled to.
    pub recurrent_norm: f64,
    /// Input weights are drawn from `[-input_scale, input_scale]`.
    pub input_scale: f64,
    /// Leak rate of the state update, in `(0, 1]`.
    pub leak_rate: f64,
    /// Ridge penalty of the readout.
    pub ridge_penalty: f64,
    /// Seed of the reservoir weights.
    pub seed: u64,
    /// Declared confidence.
    pub confidence: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            window: 30,
            units: 64,
            recurrent_norm: 0.9,
            input_scale: 0.5,
            leak_rate: 0.3,
            ridge_penalty: 1e-4,
            seed: 42,
            confidence: 0.85,
        }
    }
}

impl SequenceConfig {
    /// Window actually used for a series of length `n`.
    ///
    /// The configured window whenever the history yields at least two
    /// training windows, else half the history (at least 2).
    pub fn effective_window(&self, n: usize) -> usize {
        if n >= self.window + 2 {
            self.window
        } else {
            (n / 2).max(2)
        }
    }
}

/// Fitted state, also the exported blob. The reservoir is rebuilt from the
/// configuration stored alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SequenceState {
    config: SequenceConfig,
    window: usize,
    scale: ScaleParams,
    readout: RidgeFit,
    /// Last `window` normalized values.
    history: Vec<f64>,
    accuracy: f64,
}

/// Echo-state sequence forecaster.
///
/// Forecasting is iterative: each prediction is appended to the window and
/// the oldest value dropped, so errors compound with the horizon.
#[derive(Debug, Clone)]
pub struct SequenceForecaster {
    config: SequenceConfig,
    reservoir: Reservoir,
    state: Option<SequenceState>,
}

impl Default for SequenceForecaster {
    fn default() -> Self {
        Self::new(SequenceConfig::default())
    }
}

impl SequenceForecaster {
    /// Name used in weights, exclusions and state maps.
    pub const NAME: &'static str = "sequence";

    /// Create a forecaster with the given configuration.
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            reservoir: build_reservoir(&config),
            config,
            state: None,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }
}

fn build_reservoir(config: &SequenceConfig) -> Reservoir {
    Reservoir::new(
        config.units,
        config.recurrent_norm,
        config.input_scale,
        config.leak_rate,
        config.seed,
    )
}

impl Forecaster for SequenceForecaster {
    fn fit(&mut self, data: &TrainingData<'_>) -> Result<()> {
        let stock = data.series.stock();
        ensure_signal(Self::NAME, stock)?;

        let n = stock.len();
        let window = self.config.effective_window(n);
        if n <= window + 1 {
            return Err(EngineError::InsufficientData {
                needed: window + 2,
                got: n,
            });
        }

        let scaled = normalize(stock);
        let values = &scaled.data;

        let states: Vec<Vec<f64>> = (window..n)
            .map(|t| self.reservoir.forward_sequence(&values[t - window..t]))
            .collect();
        let targets = &values[window..];

        let readout = ridge_fit(&states, targets, self.config.ridge_penalty)
            .map_err(|e| EngineError::model_fit(Self::NAME, e.to_string()))?;

        let fitted: Vec<f64> = states
            .iter()
            .map(|s| scaled.params.inverse(readout.predict(s)))
            .collect();
        if fitted.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::NumericInstability {
                model: Self::NAME.to_string(),
            });
        }
        let accuracy = accuracy_score(&stock[window..], &fitted);
        debug!(model = Self::NAME, window, samples = states.len(), accuracy, "readout fitted");

        self.state = Some(SequenceState {
            config: self.config,
            window,
            scale: scaled.params,
            readout,
            history: values[n - window..].to_vec(),
            accuracy,
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(EngineError::FitRequired)?;

        let mut buffer = state.history.clone();
        let mut predictions = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let features = self.reservoir.forward_sequence(&buffer);
            let next = state.readout.predict(&features);
            if !next.is_finite() {
                return Err(EngineError::NumericInstability {
                    model: Self::NAME.to_string(),
                });
            }
            predictions.push(state.scale.inverse(next));
            buffer.remove(0);
            buffer.push(next);
        }

        Ok(Forecast::from_values(predictions))
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
        let state: SequenceState = serde_json::from_slice(state)?;
        if state.history.len() != state.window {
            return Err(EngineError::DimensionMismatch {
                expected: state.window,
                got: state.history.len(),
            });
        }
        if state.config != self.config {
            self.reservoir = build_reservoir(&state.config);
            self.config = state.config;
        }
        self.state = Some(state);
        Ok(())
    }
}
