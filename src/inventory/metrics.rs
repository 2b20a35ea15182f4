//! Stock metrics derived from a combined forecast.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{ConfidenceInterval, ObservationSeries};
use crate::detection::dominant_period;
use crate::error::{EngineError, Result};
use crate::utils::stats::{mean, population_std, tail};

/// Replenishment policy constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockPolicy {
    /// Supplier lead time in days.
    pub lead_time_days: f64,
    /// Safety stock expressed in days of sales.
    pub safety_stock_days: f64,
    /// Days of sales one order should cover.
    pub coverage_days: f64,
    /// Trailing window for volatility and average sales.
    pub volatility_window: usize,
    /// Normal quantile of the interval.
    pub z_score: f64,
}

impl Default for StockPolicy {
    fn default() -> Self {
        Self {
            lead_time_days: 7.0,
            safety_stock_days: 3.0,
            coverage_days: 30.0,
            volatility_window: 30,
            z_score: 1.96,
        }
    }
}

impl StockPolicy {
    /// Reject non-finite or negative constants.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("lead_time_days", self.lead_time_days),
            ("safety_stock_days", self.safety_stock_days),
            ("coverage_days", self.coverage_days),
            ("z_score", self.z_score),
        ];
        if let Some((name, value)) = named.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
        if self.volatility_window == 0 {
            return Err(EngineError::InvalidParameter(
                "volatility_window must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Seasonality of the sales history relative to its overall mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalFactors {
    /// Mean sales on the busiest weekday over the overall mean.
    pub weekly_pattern: f64,
    /// Mean sales of the trailing window over the overall mean.
    pub monthly_trend: f64,
    /// Share of periodogram power at the dominant period, in `[0, 1]`.
    pub seasonal_strength: f64,
    /// Dominant period in days; 0 when none was found.
    pub dominant_period: usize,
}

impl Default for SeasonalFactors {
    fn default() -> Self {
        Self {
            weekly_pattern: 1.0,
            monthly_trend: 1.0,
            seasonal_strength: 0.0,
            dominant_period: 0,
        }
    }
}

/// Inventory figures attached to a forecast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StockMetrics {
    /// Stock level that should trigger an order; never negative.
    pub reorder_point: f64,
    /// Units to order; never negative.
    pub reorder_quantity: f64,
    /// 1-based forecast day on which stock runs out, if within the horizon.
    pub days_until_stockout: Option<u32>,
    /// Seasonality of the sales history.
    pub seasonal_factors: SeasonalFactors,
}

/// Computes intervals and [`StockMetrics`] from history and a point forecast.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockMetricsCalculator {
    policy: StockPolicy,
}

impl StockMetricsCalculator {
    /// Create a calculator with the given policy.
    pub fn new(policy: StockPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use.
    pub fn policy(&self) -> &StockPolicy {
        &self.policy
    }

    /// Symmetric interval around every point.
    ///
    /// The half-width is `z` times the population standard deviation of the
    /// trailing stock window and does not grow with the horizon.
    pub fn intervals(&self, series: &ObservationSeries, points: &[f64]) -> Vec<ConfidenceInterval> {
        let recent = tail(series.stock(), self.policy.volatility_window);
        let half_width = self.policy.z_score * population_std(recent);
        points
            .iter()
            .map(|p| ConfidenceInterval {
                lower: p - half_width,
                upper: p + half_width,
            })
            .collect()
    }

    /// Mean sales over the trailing window; zero for an empty history.
    pub fn average_daily_sales(&self, series: &ObservationSeries) -> f64 {
        let recent = tail(series.sales(), self.policy.volatility_window);
        if recent.is_empty() {
            0.0
        } else {
            mean(recent)
        }
    }

    /// Reorder figures, stockout day and seasonal factors.
    pub fn metrics(&self, series: &ObservationSeries, points: &[f64]) -> StockMetrics {
        let avg_sales = self.average_daily_sales(series);
        let reorder_point =
            (avg_sales * self.policy.lead_time_days + avg_sales * self.policy.safety_stock_days).max(0.0);
        let reorder_quantity = (avg_sales * self.policy.coverage_days).max(0.0);
        let days_until_stockout = days_until_stockout(points, series.last_stock(), avg_sales);

        debug!(
            product_id = series.product_id(),
            avg_sales,
            reorder_point,
            stockout = ?days_until_stockout,
            "stock metrics computed"
        );

        StockMetrics {
            reorder_point,
            reorder_quantity,
            days_until_stockout,
            seasonal_factors: self.seasonal_factors(series),
        }
    }

    /// Weekly, monthly and spectral seasonality of the sales history.
    pub fn seasonal_factors(&self, series: &ObservationSeries) -> SeasonalFactors {
        let sales = series.sales();
        let overall = mean(sales);
        if !overall.is_finite() || overall <= 0.0 {
            return SeasonalFactors::default();
        }

        let mut sums = [0.0; 7];
        let mut counts = [0usize; 7];
        for (date, q) in series.dates().iter().zip(sales) {
            let day = date.weekday().num_days_from_monday() as usize;
            sums[day] += q;
            counts[day] += 1;
        }
        let peak = sums
            .iter()
            .zip(&counts)
            .filter(|(_, &c)| c > 0)
            .map(|(s, &c)| s / c as f64)
            .fold(f64::NEG_INFINITY, f64::max);

        let monthly = mean(tail(sales, self.policy.volatility_window));
        let (seasonal_strength, dominant) = dominant_period(sales)
            .map(|d| (d.strength, d.period))
            .unwrap_or((0.0, 0));

        SeasonalFactors {
            weekly_pattern: peak / overall,
            monthly_trend: monthly / overall,
            seasonal_strength,
            dominant_period: dominant,
        }
    }
}

/// First forecast day at or below zero, else the run-rate estimate when it
/// falls inside the horizon.
fn days_until_stockout(points: &[f64], last_stock: f64, avg_sales: f64) -> Option<u32> {
    if let Some(step) = points.iter().position(|p| *p <= 0.0) {
        return Some(step as u32 + 1);
    }
    if avg_sales <= 0.0 {
        return None;
    }
    let days = (last_stock.max(0.0) / avg_sales).ceil();
    (days <= points.len() as f64).then_some(days as u32)
}
