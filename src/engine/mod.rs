//! Forecasting and recommendation engines.
//!
//! The engines own their models and snapshots; the free functions
//! [`forecast`] and [`recommend`] are one-shot conveniences using the
//! default configuration.

mod forecast_engine;
mod pool;
mod recommend_engine;

pub use forecast_engine::{FittedEnsemble, ForecastEngine, ForecastRequest, SERIES_STATE_KEY};
pub use pool::{BatchOutcome, WorkerPool};
pub use recommend_engine::{
    RecommendRequest, RecommendationEngine, COLLABORATIVE_STATE_KEY, CONTENT_STATE_KEY,
};

use crate::config::EngineConfig;
use crate::core::{ForecastResult, HistoricalObservation};
use crate::error::Result;
use crate::features::ExternalFactors;
use crate::recommend::{CatalogItem, InteractionRecord, RankedRecommendationList};

/// Forecast one product with the default configuration.
///
/// # Errors
/// See [`ForecastEngine::forecast`].
pub fn forecast(
    product_id: &str,
    observations: &[HistoricalObservation],
    horizon_days: usize,
    external_factors: Option<&ExternalFactors>,
) -> Result<ForecastResult> {
    let engine = ForecastEngine::new(EngineConfig::default())?;
    let none = ExternalFactors::new();
    engine.forecast(product_id, observations, horizon_days, external_factors.unwrap_or(&none))
}

/// Recommend for one user with the default configuration.
///
/// Never fails: unknown users fall back to popularity and unknown
/// current products contribute nothing.
pub fn recommend(
    user_id: &str,
    interactions: &[InteractionRecord],
    catalog_items: &[CatalogItem],
    current_product_id: Option<&str>,
    k: usize,
) -> RankedRecommendationList {
    recommend_engine::recommend_once(user_id, interactions, catalog_items, current_product_id, k)
}
