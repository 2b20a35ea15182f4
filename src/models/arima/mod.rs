//! ARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - ARIMA(p, d, q) estimated by conditional sum of squares
//! - the classical stock forecaster built on it

mod classical;
mod diff;
mod model;

pub use classical::{ClassicalConfig, ClassicalForecaster};
pub use diff::{difference, integrate};
pub use model::{ARIMASpec, ARIMA};
