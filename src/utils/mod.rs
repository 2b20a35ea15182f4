//! Numerical utilities shared by the forecasting models.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::accuracy_score;
pub use ols::{ols_fit, ridge_fit, OLSResult, RidgeFit};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{mean, population_std};
