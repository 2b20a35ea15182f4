//! Sparse user x item interaction matrix.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One purchase or interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Customer.
    pub user_id: String,
    /// Product interacted with.
    pub product_id: String,
    /// Units bought.
    pub quantity: f64,
}

impl InteractionRecord {
    /// Create a record.
    pub fn new(user_id: impl Into<String>, product_id: impl Into<String>, quantity: f64) -> Self {
        Self {
            user_id: user_id.into(),
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// How repeated (user, product) records are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Average quantity.
    #[default]
    Mean,
    /// Total quantity.
    Sum,
}

/// Aggregated quantities keyed by user, then product. Missing cells are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserItemMatrix {
    rows: BTreeMap<String, BTreeMap<String, f64>>,
    items: BTreeSet<String>,
}

impl UserItemMatrix {
    /// Aggregate interaction records.
    ///
    /// Records with a non-finite quantity are skipped.
    pub fn from_records(records: &[InteractionRecord], aggregation: Aggregation) -> Self {
        let mut cells: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
        let mut skipped = 0usize;
        for record in records {
            if !record.quantity.is_finite() {
                skipped += 1;
                continue;
            }
            let cell = cells
                .entry((record.user_id.as_str(), record.product_id.as_str()))
                .or_insert((0.0, 0));
            cell.0 += record.quantity;
            cell.1 += 1;
        }
        if skipped > 0 {
            warn!(skipped, "interaction records with non-finite quantity ignored");
        }

        let mut rows: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        let mut items = BTreeSet::new();
        for ((user, product), (sum, count)) in cells {
            let value = match aggregation {
                Aggregation::Mean => sum / count as f64,
                Aggregation::Sum => sum,
            };
            rows.entry(user.to_string())
                .or_default()
                .insert(product.to_string(), value);
            items.insert(product.to_string());
        }

        Self { rows, items }
    }

    /// Number of users.
    pub fn n_users(&self) -> usize {
        self.rows.len()
    }

    /// Number of items.
    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// True when no interaction was recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Users in ascending id order.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Items in ascending id order; this is the column order of dense rows.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// True when the user has a row.
    pub fn contains_user(&self, user_id: &str) -> bool {
        self.rows.contains_key(user_id)
    }

    /// Aggregated quantity of one cell.
    pub fn get(&self, user_id: &str, product_id: &str) -> f64 {
        self.rows
            .get(user_id)
            .and_then(|row| row.get(product_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// Non-zero cells of one user.
    pub fn user_row(&self, user_id: &str) -> Option<&BTreeMap<String, f64>> {
        self.rows.get(user_id)
    }

    /// Row of one user over all items, in [`items`](Self::items) order.
    pub fn dense_row(&self, user_id: &str) -> Option<Vec<f64>> {
        let row = self.rows.get(user_id)?;
        Some(
            self.items
                .iter()
                .map(|item| row.get(item).copied().unwrap_or(0.0))
                .collect(),
        )
    }

    /// Column sums.
    pub fn item_totals(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = self.items.iter().map(|i| (i.clone(), 0.0)).collect();
        for row in self.rows.values() {
            for (item, q) in row {
                if let Some(total) = totals.get_mut(item) {
                    *total += q;
                }
            }
        }
        totals
    }
}
