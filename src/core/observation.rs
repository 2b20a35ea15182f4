//! Per-product stock and sales history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One day of stock and sales for a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalObservation {
    /// Calendar day of the observation.
    pub date: NaiveDate,
    /// Units on hand at the end of the day.
    pub stock_level: f64,
    /// Units sold during the day.
    pub sales_quantity: f64,
    /// Product the observation belongs to.
    pub product_id: String,
}

impl HistoricalObservation {
    /// Create a new observation.
    pub fn new(
        product_id: impl Into<String>,
        date: NaiveDate,
        stock_level: f64,
        sales_quantity: f64,
    ) -> Self {
        Self {
            date,
            stock_level,
            sales_quantity,
            product_id: product_id.into(),
        }
    }
}

/// Validated, date-ordered history of one product in columnar layout.
///
/// Construction sorts by date and guarantees unique dates, a single product
/// id and finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    product_id: String,
    dates: Vec<NaiveDate>,
    stock: Vec<f64>,
    sales: Vec<f64>,
}

impl ObservationSeries {
    /// Validate and sort observations for `product_id`.
    ///
    /// # Errors
    /// * `InsufficientData` when `observations` is empty.
    /// * `InvalidParameter` when an observation belongs to another product or
    ///   carries a non-finite value.
    /// * `TimestampError` when two observations share a date.
    pub fn from_observations(product_id: &str, observations: &[HistoricalObservation]) -> Result<Self> {
        if observations.is_empty() {
            return Err(EngineError::InsufficientData { needed: 1, got: 0 });
        }

        if let Some(other) = observations.iter().find(|o| o.product_id != product_id) {
            return Err(EngineError::InvalidParameter(format!(
                "observation for product '{}' in history of '{}'",
                other.product_id, product_id
            )));
        }

        if let Some(bad) = observations
            .iter()
            .find(|o| !o.stock_level.is_finite() || !o.sales_quantity.is_finite())
        {
            return Err(EngineError::InvalidParameter(format!(
                "non-finite stock or sales value on {}",
                bad.date
            )));
        }

        let mut sorted: Vec<&HistoricalObservation> = observations.iter().collect();
        sorted.sort_by_key(|o| o.date);

        if let Some(pair) = sorted.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(EngineError::TimestampError(format!(
                "duplicate observation date {}",
                pair[0].date
            )));
        }

        Ok(Self {
            product_id: product_id.to_string(),
            dates: sorted.iter().map(|o| o.date).collect(),
            stock: sorted.iter().map(|o| o.stock_level).collect(),
            sales: sorted.iter().map(|o| o.sales_quantity).collect(),
        })
    }

    /// Product the series belongs to.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Observation dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Stock levels aligned with [`dates`](Self::dates).
    pub fn stock(&self) -> &[f64] {
        &self.stock
    }

    /// Sales quantities aligned with [`dates`](Self::dates).
    pub fn sales(&self) -> &[f64] {
        &self.sales
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always false for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Most recent stock level.
    pub fn last_stock(&self) -> f64 {
        self.stock.last().copied().unwrap_or(0.0)
    }

    /// Most recent observation date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}
