//! Engineered feature table for the tree ensemble.
//!
//! One row per observation, columns in a fixed order with the stock level in
//! slot 0 so iterative forecasting can overwrite it in place.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::ObservationSeries;
use crate::error::{EngineError, Result};
use crate::transform::{fill_forward_backward, lagged, rolling_mean, rolling_std};

/// Index of the stock-level column.
pub const STOCK_SLOT: usize = 0;

/// An external driver supplied alongside the history (promotions, price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalFactor {
    /// Same value on every row.
    Constant(f64),
    /// One value per observation; `NaN` marks a gap.
    Series(Vec<f64>),
}

/// Named external factors; the map order fixes the column order.
pub type ExternalFactors = BTreeMap<String, ExternalFactor>;

/// One engineered row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Date of the source observation.
    pub date: NaiveDate,
    /// Values in [`FeatureTable::columns`] order.
    pub values: Vec<f64>,
}

/// Engineered features, one row per input observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<FeatureVector>,
}

impl FeatureTable {
    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of a named column, if present.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Row-major copy of all values.
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }

    /// Most recent row.
    pub fn last(&self) -> Option<&FeatureVector> {
        self.rows.last()
    }
}

/// Builds a [`FeatureTable`] from an observation series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureEngineer {
    /// Rolling mean/std windows in days.
    pub rolling_windows: Vec<usize>,
    /// Lags in days.
    pub lags: Vec<usize>,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self {
            rolling_windows: vec![7, 30],
            lags: vec![1, 3, 7, 14],
        }
    }
}

impl FeatureEngineer {
    /// Create an engineer with the default windows and lags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum number of observations: twice the longest lag.
    pub fn min_observations(&self) -> usize {
        2 * self.lags.iter().copied().max().unwrap_or(1)
    }

    /// Column names produced for the given external factors.
    pub fn column_names(&self, external: &ExternalFactors) -> Vec<String> {
        let mut names: Vec<String> = ["stock_level", "sales", "day_of_week", "month", "quarter", "is_weekend"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for source in ["stock", "sales"] {
            for w in &self.rolling_windows {
                names.push(format!("{source}_ma_{w}"));
            }
        }
        for source in ["stock", "sales"] {
            for w in &self.rolling_windows {
                names.push(format!("{source}_std_{w}"));
            }
        }
        for source in ["stock", "sales"] {
            for lag in &self.lags {
                names.push(format!("{source}_lag_{lag}"));
            }
        }
        names.push("stock_velocity".to_string());
        names.push("days_of_stock".to_string());
        for name in external.keys() {
            names.push(format!("external_{name}"));
        }
        names
    }

    /// Engineer the feature table.
    ///
    /// Rolling windows longer than the history shrink to its length. Gaps
    /// left by warm-up periods or missing external values are filled
    /// forward, then backward.
    ///
    /// # Errors
    /// * `InsufficientData` for fewer than [`min_observations`](Self::min_observations)
    ///   rows, or when a column has no value left to fill from.
    /// * `DimensionMismatch` when an external series does not match the
    ///   history length.
    pub fn transform(&self, series: &ObservationSeries, external: &ExternalFactors) -> Result<FeatureTable> {
        let n = series.len();
        let needed = self.min_observations();
        if n < needed {
            return Err(EngineError::InsufficientData { needed, got: n });
        }

        let stock = series.stock();
        let sales = series.sales();
        let dates = series.dates();

        let mut columns: Vec<Vec<f64>> = vec![
            stock.to_vec(),
            sales.to_vec(),
            dates.iter().map(|d| d.weekday().num_days_from_monday() as f64).collect(),
            dates.iter().map(|d| d.month() as f64).collect(),
            dates.iter().map(|d| ((d.month() - 1) / 3 + 1) as f64).collect(),
            dates
                .iter()
                .map(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun) as u8 as f64)
                .collect(),
        ];

        for source in [stock, sales] {
            for &w in &self.rolling_windows {
                columns.push(rolling_mean(source, w.min(n)));
            }
        }
        for source in [stock, sales] {
            for &w in &self.rolling_windows {
                columns.push(rolling_std(source, w.min(n)));
            }
        }
        for source in [stock, sales] {
            for &lag in &self.lags {
                columns.push(lagged(source, lag));
            }
        }

        let sales_ma_short = rolling_mean(sales, self.short_window().min(n));
        columns.push(
            stock
                .iter()
                .zip(sales)
                .map(|(&s, &q)| q / non_zero(s))
                .collect(),
        );
        columns.push(
            stock
                .iter()
                .zip(&sales_ma_short)
                .map(|(&s, &m)| s / non_zero(m))
                .collect(),
        );

        for factor in external.values() {
            columns.push(match factor {
                ExternalFactor::Constant(v) => vec![*v; n],
                ExternalFactor::Series(values) => {
                    if values.len() != n {
                        return Err(EngineError::DimensionMismatch {
                            expected: n,
                            got: values.len(),
                        });
                    }
                    values.iter().map(|v| if v.is_finite() { *v } else { f64::NAN }).collect()
                }
            });
        }

        let names = self.column_names(external);
        for (name, column) in names.iter().zip(columns.iter_mut()) {
            if !fill_forward_backward(column) {
                tracing::debug!(column = %name, "feature column has no observed value");
                return Err(EngineError::InsufficientData { needed: 1, got: 0 });
            }
        }

        let rows = dates
            .iter()
            .enumerate()
            .map(|(i, &date)| FeatureVector {
                date,
                values: columns.iter().map(|c| c[i]).collect(),
            })
            .collect();

        Ok(FeatureTable {
            columns: names,
            rows,
        })
    }

    fn short_window(&self) -> usize {
        self.rolling_windows.iter().copied().min().unwrap_or(7).max(1)
    }
}

/// Zero denominators are replaced by one; `NaN` passes through for filling.
fn non_zero(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        value
    }
}
