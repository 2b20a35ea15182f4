//! Tree-based regressors and the tree ensemble forecaster.
//!
//! This module provides:
//! - CART regression trees with squared-error splits
//! - a bootstrap random forest and least-squares gradient boosting
//! - the forecaster combining both over the feature table

mod cart;
mod forest;
mod model;

pub use cart::{CartParams, Node, RegressionTree};
pub use forest::{GradientBoosting, RandomForest};
pub use model::{TreeConfig, TreeEnsembleForecaster};
