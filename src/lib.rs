//! # anofox-retail
//!
//! Stock forecasting and product recommendation for retail catalogs.
//!
//! The forecasting engine fits a classical ARIMA model, an echo-state
//! sequence model and a tree ensemble on each product's stock history,
//! combines their forecasts by confidence and derives intervals, stockout
//! day and reorder figures. The recommendation engine blends user-based
//! collaborative filtering with TF-IDF content similarity and falls back
//! to popularity for unknown users.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod detection;
pub mod engine;
pub mod error;
pub mod features;
pub mod inventory;
pub mod models;
pub mod recommend;
pub mod simd;
pub mod transform;
pub mod utils;
pub mod validation;

pub use engine::{forecast, recommend};
pub use error::{EngineError, Result};

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::{ForecastResult, HistoricalObservation};
    pub use crate::engine::{FittedEnsemble, ForecastEngine, RecommendationEngine};
    pub use crate::error::{EngineError, Result};
    pub use crate::features::ExternalFactors;
    pub use crate::inventory::StockMetrics;
    pub use crate::models::Forecaster;
    pub use crate::recommend::{CatalogItem, InteractionRecord, RankedRecommendationList};
}
