//! Random forest and gradient boosting regressors over CART trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::tree::cart::{CartParams, RegressionTree};

/// Bootstrap-aggregated regression trees.
///
/// Tree `i` draws its sample from `StdRng::seed_from_u64(seed + i)`, so the
/// forest is reproducible regardless of how rayon schedules the trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Grow `n_trees` trees on bootstrap samples of the rows of `x`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], n_trees: usize, params: &CartParams, seed: u64) -> Self {
        let n = y.len();
        let trees = (0..n_trees.max(1))
            .into_par_iter()
            .map(|i| {
                let sample = bootstrap_sample(n, seed.wrapping_add(i as u64));
                RegressionTree::fit(x, y, &sample, params)
            })
            .collect();
        Self { trees }
    }

    /// Mean prediction over all trees.
    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Number of trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// `n` row indices drawn with replacement.
fn bootstrap_sample(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Least-squares gradient boosting.
///
/// Starts from the target mean; each round fits a shallow tree to the
/// current residuals and adds it scaled by the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    /// Run up to `rounds` boosting rounds.
    ///
    /// Stops early once the residuals vanish.
    pub fn fit(x: &[Vec<f64>], y: &[f64], rounds: usize, learning_rate: f64, params: &CartParams) -> Self {
        let n = y.len();
        let init = if n == 0 { 0.0 } else { y.iter().sum::<f64>() / n as f64 };
        let indices: Vec<usize> = (0..n).collect();
        let mut current = vec![init; n];
        let mut trees = Vec::with_capacity(rounds);

        for _ in 0..rounds {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            if residuals.iter().all(|r| r.abs() <= 1e-12) {
                break;
            }
            let tree = RegressionTree::fit(x, &residuals, &indices, params);
            for (p, row) in current.iter_mut().zip(x) {
                *p += learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Self {
            init,
            learning_rate,
            trees,
        }
    }

    /// Predict one row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Number of rounds actually run.
    pub fn rounds(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quadratic(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / n as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 4.0 * r[0] * r[0]).collect();
        (x, y)
    }

    #[test]
    fn bootstrap_is_seeded() {
        assert_eq!(bootstrap_sample(50, 9), bootstrap_sample(50, 9));
        assert_ne!(bootstrap_sample(50, 9), bootstrap_sample(50, 10));
        assert!(bootstrap_sample(50, 9).iter().all(|&i| i < 50));
    }

    #[test]
    fn forest_is_reproducible() {
        let (x, y) = quadratic(40);
        let a = RandomForest::fit(&x, &y, 10, &CartParams::default(), 42);
        let b = RandomForest::fit(&x, &y, 10, &CartParams::default(), 42);
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 10);
    }

    #[test]
    fn forest_tracks_curve() {
        let (x, y) = quadratic(60);
        let forest = RandomForest::fit(&x, &y, 30, &CartParams::default(), 1);
        assert_relative_eq!(forest.predict(&[0.5]), 1.0, epsilon = 0.2);
        assert!(forest.predict(&[0.95]) > forest.predict(&[0.2]));
    }

    #[test]
    fn boosting_reduces_training_error() {
        let (x, y) = quadratic(50);
        let params = CartParams {
            max_depth: Some(3),
            ..Default::default()
        };
        let few = GradientBoosting::fit(&x, &y, 5, 0.1, &params);
        let many = GradientBoosting::fit(&x, &y, 100, 0.1, &params);

        let sse = |m: &GradientBoosting| -> f64 {
            x.iter().zip(&y).map(|(r, t)| (m.predict(r) - t).powi(2)).sum()
        };
        assert!(sse(&many) < sse(&few));
    }

    #[test]
    fn boosting_on_constant_target_stops_immediately() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![7.0; 10];
        let model = GradientBoosting::fit(&x, &y, 100, 0.1, &CartParams::default());
        assert_eq!(model.rounds(), 0);
        assert_eq!(model.predict(&[3.0]), 7.0);
    }
}
