//! Core data structures shared by both engines.

mod forecast;
mod observation;

pub use forecast::{ConfidenceInterval, ExcludedModel, Forecast, ForecastResult};
pub use observation::{HistoricalObservation, ObservationSeries};
