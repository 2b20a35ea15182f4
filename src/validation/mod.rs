//! Statistical tests run before model fitting.

pub mod stationarity;

pub use stationarity::{adf_test, CriticalValues, StationarityResult};
