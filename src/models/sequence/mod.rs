//! Echo-state sequence forecaster.

mod model;
mod reservoir;

pub use model::{SequenceConfig, SequenceForecaster};
pub use reservoir::Reservoir;
