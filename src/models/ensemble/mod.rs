//! Ensemble combination of sub-model forecasts.

mod combiner;

pub use combiner::{Combination, ForecastCombiner};
