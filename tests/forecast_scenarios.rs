//! End-to-end forecasting scenarios through the public API.

use std::collections::BTreeMap;

use anofox_retail::config::EngineConfig;
use anofox_retail::core::HistoricalObservation;
use anofox_retail::engine::{ForecastEngine, ForecastRequest, SERIES_STATE_KEY};
use anofox_retail::features::{ExternalFactor, ExternalFactors};
use anofox_retail::EngineError;
use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};

fn history(product: &str, n: usize, stock: impl Fn(usize) -> f64, sales: impl Fn(usize) -> f64) -> Vec<HistoricalObservation> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    (0..n)
        .map(|i| HistoricalObservation::new(product, start + Duration::days(i as i64), stock(i), sales(i)))
        .collect()
}

fn light_engine() -> ForecastEngine {
    let config = EngineConfig::from_toml_str(
        r#"
        workers = 2

        [forecast.trees]
        n_estimators = 12
        boosting_rounds = 25
        "#,
    )
    .unwrap();
    ForecastEngine::new(config).unwrap()
}

#[test]
fn flat_stock_gives_exact_stock_metrics() {
    let observations = history("SKU-FLAT", 40, |_| 100.0, |_| 10.0);
    let result = anofox_retail::forecast("SKU-FLAT", &observations, 7, None).unwrap();

    assert_eq!(result.product_id, "SKU-FLAT");
    assert_eq!(result.point_estimates.len(), 7);
    assert_eq!(result.stock_metrics.days_until_stockout, Some(10));
    assert_relative_eq!(result.stock_metrics.reorder_point, 100.0, epsilon = 1e-9);
    assert!(result.stock_metrics.reorder_quantity >= 0.0);
    assert_relative_eq!(
        result.contributing_model_weights.values().sum::<f64>(),
        1.0,
        epsilon = 1e-6
    );
    assert!(result.excluded_models.iter().any(|m| m.model == "arima"));
}

#[test]
fn zero_stock_has_no_model() {
    let observations = history("SKU-ZERO", 40, |_| 0.0, |_| 0.0);
    let err = light_engine()
        .forecast("SKU-ZERO", &observations, 5, &ExternalFactors::new())
        .unwrap_err();
    match err {
        EngineError::NoModelAvailable { excluded } => {
            assert_eq!(excluded, vec!["arima", "sequence", "trees"]);
        }
        other => panic!("expected NoModelAvailable, got {other:?}"),
    }
}

#[test]
fn zero_horizon_is_invalid() {
    let observations = history("SKU-1", 40, |i| 100.0 - i as f64, |_| 1.0);
    let err = anofox_retail::forecast("SKU-1", &observations, 0, None).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter(_)));
}

#[test]
fn empty_history_needs_feature_minimum() {
    let err = anofox_retail::forecast("SKU-NEW", &[], 7, None).unwrap_err();
    assert_eq!(err, EngineError::InsufficientData { needed: 28, got: 0 });
}

#[test]
fn duplicate_dates_are_rejected() {
    let mut observations = history("SKU-1", 40, |i| 100.0 - i as f64, |_| 1.0);
    observations.push(observations[3].clone());
    let err = light_engine()
        .forecast("SKU-1", &observations, 3, &ExternalFactors::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::TimestampError(_)));
}

#[test]
fn mixed_products_are_rejected() {
    let mut observations = history("SKU-1", 40, |i| 100.0 - i as f64, |_| 1.0);
    observations[5].product_id = "SKU-2".to_string();
    let err = light_engine()
        .forecast("SKU-1", &observations, 3, &ExternalFactors::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter(_)));
}

#[test]
fn depleting_stock_runs_out() {
    let observations = history("SKU-DROP", 60, |i| 300.0 - 4.0 * i as f64 + (i % 7) as f64, |_| 4.0);
    let result = light_engine()
        .forecast("SKU-DROP", &observations, 30, &ExternalFactors::new())
        .unwrap();

    for (point, ci) in result.point_estimates.iter().zip(&result.confidence_intervals) {
        assert!(ci.lower <= *point && *point <= ci.upper);
    }
    let days = result.stock_metrics.days_until_stockout.unwrap();
    assert!(days >= 1 && days <= 31, "stockout after {days} days");
    assert!(result.accuracy_estimate >= 0.0 && result.accuracy_estimate <= 1.0);
}

#[test]
fn external_factors_are_accepted() {
    let n = 45;
    let observations = history("SKU-PROMO", n, |i| 150.0 - (i % 10) as f64 * 3.0, |i| 2.0 + (i % 3) as f64);
    let mut external = ExternalFactors::new();
    external.insert(
        "promotion".to_string(),
        ExternalFactor::Series((0..n).map(|i| if i % 10 == 0 { 1.0 } else { 0.0 }).collect()),
    );
    let result = light_engine()
        .forecast("SKU-PROMO", &observations, 10, &external)
        .unwrap();
    assert_eq!(result.point_estimates.len(), 10);

    external.insert("broken".to_string(), ExternalFactor::Series(vec![1.0; 3]));
    let err = light_engine()
        .forecast("SKU-PROMO", &observations, 10, &external)
        .unwrap_err();
    assert!(matches!(err, EngineError::DimensionMismatch { .. }));
}

#[test]
fn exported_ensemble_restores_elsewhere() {
    let observations = history("SKU-EXP", 50, |i| 90.0 + ((i as f64) * 0.9).sin() * 6.0, |_| 3.0);
    let engine = light_engine();
    let fitted = engine
        .fit("SKU-EXP", &observations, &ExternalFactors::new())
        .unwrap();
    let state: BTreeMap<String, Vec<u8>> = fitted.export_state().unwrap();
    assert!(state.contains_key(SERIES_STATE_KEY));
    for name in fitted.model_names() {
        assert!(state.contains_key(name));
    }

    let restored = light_engine().import_state(&state).unwrap();
    assert_eq!(restored.product_id(), "SKU-EXP");
    assert_eq!(
        restored.forecast(12).unwrap().point_estimates,
        fitted.forecast(12).unwrap().point_estimates
    );

    let mut corrupt = state.clone();
    corrupt.insert("sequence".to_string(), b"not json".to_vec());
    assert!(matches!(
        engine.import_state(&corrupt),
        Err(EngineError::Serialization(_))
    ));
}

#[test]
fn batch_reports_each_product() {
    let requests = vec![
        ForecastRequest::new("A", history("A", 40, |_| 100.0, |_| 10.0), 7),
        ForecastRequest::new("B", history("B", 12, |i| 50.0 - i as f64, |_| 1.0), 7),
        ForecastRequest::new("C", history("C", 40, |i| 80.0 + (i % 4) as f64, |_| 2.0), 7),
    ];
    let outcomes = light_engine().forecast_batch(requests).unwrap();

    let keys: Vec<&str> = outcomes.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["A", "B", "C"]);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(
        outcomes[1].result,
        Err(EngineError::InsufficientData { needed: 28, got: 12 })
    ));
    assert_eq!(outcomes[2].result.as_ref().unwrap().point_estimates.len(), 7);
}
