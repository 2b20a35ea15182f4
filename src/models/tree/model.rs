//! Tree ensemble forecaster over the engineered feature table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Forecast;
use crate::error::{EngineError, Result};
use crate::features::STOCK_SLOT;
use crate::models::traits::{ensure_signal, Forecaster, TrainingData};
use crate::models::tree::cart::CartParams;
use crate::models::tree::forest::{GradientBoosting, RandomForest};
use crate::utils::metrics::accuracy_score;

/// Configuration of the tree ensemble forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Trees in the random forest.
    pub n_estimators: usize,
    /// Gradient boosting rounds.
    pub boosting_rounds: usize,
    /// Depth of each boosting tree.
    pub max_depth: usize,
    /// Depth limit of forest trees; `None` grows them fully.
    pub forest_max_depth: Option<usize>,
    /// Shrinkage of each boosting round.
    pub learning_rate: f64,
    /// Weight of the forest prediction.
    pub forest_weight: f64,
    /// Weight of the boosting prediction.
    pub boosting_weight: f64,
    /// Smallest node that may be split.
    pub min_samples_split: usize,
    /// Smallest leaf.
    pub min_samples_leaf: usize,
    /// Bootstrap seed of the forest.
    pub seed: u64,
    /// Declared confidence.
    pub confidence: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            boosting_rounds: 100,
            max_depth: 6,
            forest_max_depth: None,
            learning_rate: 0.1,
            forest_weight: 0.6,
            boosting_weight: 0.4,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            confidence: 0.8,
        }
    }
}

/// Fitted state, also the exported blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TreeState {
    config: TreeConfig,
    forest: RandomForest,
    boosting: GradientBoosting,
    /// Most recent feature row, the starting point of every forecast.
    last_row: Vec<f64>,
    accuracy: f64,
}

impl TreeState {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.config.forest_weight * self.forest.predict(row)
            + self.config.boosting_weight * self.boosting.predict(row)
    }
}

/// Random forest plus gradient boosting on engineered features.
///
/// Training pairs feature row `t` with the stock level at `t + 1`. Forecasts
/// start from the last row and overwrite only its stock-level slot after
/// each step; lag, rolling and calendar columns keep their last observed
/// values.
#[derive(Debug, Clone, Default)]
pub struct TreeEnsembleForecaster {
    config: TreeConfig,
    state: Option<TreeState>,
}

impl TreeEnsembleForecaster {
    /// Name used in weights, exclusions and state maps.
    pub const NAME: &'static str = "trees";

    /// Create a forecaster with the given configuration.
    pub fn new(config: TreeConfig) -> Self {
        Self { config, state: None }
    }

    /// Configuration in use.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }
}

impl Forecaster for TreeEnsembleForecaster {
    fn fit(&mut self, data: &TrainingData<'_>) -> Result<()> {
        let stock = data.series.stock();
        ensure_signal(Self::NAME, stock)?;

        let table = data.features;
        if table.len() != stock.len() {
            return Err(EngineError::DimensionMismatch {
                expected: stock.len(),
                got: table.len(),
            });
        }
        if table.len() < 3 {
            return Err(EngineError::InsufficientData {
                needed: 3,
                got: table.len(),
            });
        }

        let matrix = table.matrix();
        let n = matrix.len();
        let x = &matrix[..n - 1];
        let y = &stock[1..];

        let forest_params = CartParams {
            max_depth: self.config.forest_max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
        };
        let boosting_params = CartParams {
            max_depth: Some(self.config.max_depth),
            ..forest_params
        };

        let forest = RandomForest::fit(x, y, self.config.n_estimators, &forest_params, self.config.seed);
        let boosting = GradientBoosting::fit(
            x,
            y,
            self.config.boosting_rounds,
            self.config.learning_rate,
            &boosting_params,
        );

        let mut state = TreeState {
            config: self.config,
            forest,
            boosting,
            last_row: matrix[n - 1].clone(),
            accuracy: 0.0,
        };
        let fitted: Vec<f64> = x.iter().map(|row| state.predict_row(row)).collect();
        if fitted.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::NumericInstability {
                model: Self::NAME.to_string(),
            });
        }
        state.accuracy = accuracy_score(y, &fitted);
        debug!(
            model = Self::NAME,
            trees = state.forest.n_trees(),
            rounds = state.boosting.rounds(),
            accuracy = state.accuracy,
            "tree ensemble fitted"
        );

        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(EngineError::FitRequired)?;

        let mut row = state.last_row.clone();
        let mut predictions = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = state.predict_row(&row);
            if !next.is_finite() {
                return Err(EngineError::NumericInstability {
                    model: Self::NAME.to_string(),
                });
            }
            predictions.push(next);
            row[STOCK_SLOT] = next;
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
        let state: TreeState = serde_json::from_slice(state)?;
        if state.last_row.len() <= STOCK_SLOT {
            return Err(EngineError::DimensionMismatch {
                expected: STOCK_SLOT + 1,
                got: state.last_row.len(),
            });
        }
        self.config = state.config;
        self.state = Some(state);
        Ok(())
    }
}
