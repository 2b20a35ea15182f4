//! CART regression tree with mean-squared-error splits.
//!
//! Trees train on row indices into a shared row-major matrix, so bootstrap
//! samples and boosting rounds never copy the feature table.

use serde::{Deserialize, Serialize};

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartParams {
    /// Maximum depth; `None` grows until the other limits stop it.
    pub max_depth: Option<usize>,
    /// Smallest node that may be split.
    pub min_samples_split: usize,
    /// Smallest child a split may produce.
    pub min_samples_leaf: usize,
}

impl Default for CartParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// A node of a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node predicting the mean target of its samples.
    Leaf { value: f64 },
    /// Samples with `row[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Depth of the subtree; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of leaves in the subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }
}

/// Fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x` selected by `indices`.
    ///
    /// Indices may repeat (bootstrap samples). `y` is indexed like `x`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], params: &CartParams) -> Self {
        let mut work = indices.to_vec();
        Self {
            root: build(x, y, &mut work, params, 0),
        }
    }

    /// Predict one row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Depth of the tree.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

fn mean_of(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn build(x: &[Vec<f64>], y: &[f64], indices: &mut [usize], params: &CartParams, depth: usize) -> Node {
    let value = mean_of(y, indices);
    let depth_reached = params.max_depth.map_or(false, |d| depth >= d);
    if depth_reached || indices.len() < params.min_samples_split.max(2) {
        return Node::Leaf { value };
    }

    let Some(split) = best_split(x, y, indices, params.min_samples_leaf.max(1)) else {
        return Node::Leaf { value };
    };

    let mid = partition(indices, |i| x[i][split.feature] <= split.threshold);
    let (left_idx, right_idx) = indices.split_at_mut(mid);
    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build(x, y, left_idx, params, depth + 1)),
        right: Box::new(build(x, y, right_idx, params, depth + 1)),
    }
}

/// Reorder `indices` so that those matching `pred` come first; returns
/// their count.
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..indices.len() {
        if pred(indices[j]) {
            indices.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

/// Lowest total squared error over all features and thresholds.
///
/// Returns `None` when no split reduces the parent's error.
fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize], min_leaf: usize) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < 2 * min_leaf {
        return None;
    }
    let width = x[indices[0]].len();

    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<SplitCandidate> = None;
    let mut order = indices.to_vec();

    for feature in 0..width {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for pos in 0..n - 1 {
            let yi = y[order[pos]];
            left_sum += yi;
            left_sq += yi * yi;

            let left_n = pos + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let here = x[order[pos]][feature];
            let next = x[order[pos + 1]][feature];
            if here >= next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    sse,
                });
            }
        }
    }

    best.filter(|b| parent_sse - b.sse > 1e-12 * parent_sse.abs().max(1.0))
}
