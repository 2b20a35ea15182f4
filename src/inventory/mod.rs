//! Inventory figures: intervals, stockout day, reorder levels, seasonality.

mod metrics;

pub use metrics::{SeasonalFactors, StockMetrics, StockMetricsCalculator, StockPolicy};
