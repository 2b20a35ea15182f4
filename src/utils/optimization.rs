//! Derivative-free minimization for parameter estimation.

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex collapsed below the tolerance.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrinkage coefficient.
    pub sigma: f64,
    /// Relative step used to build the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// A simplex vertex and its objective value.
#[derive(Debug, Clone)]
struct Vertex {
    point: Vec<f64>,
    value: f64,
}

/// Minimize `objective` with the Nelder-Mead simplex method.
///
/// `bounds` clamps every candidate point per dimension. Non-finite objective
/// values are treated as `+inf` so the simplex moves away from them.
///
/// # Example
/// ```
/// use anofox_retail::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] + 1.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let eval = |point: Vec<f64>| -> Vertex {
        let point = clamp_to_bounds(point, bounds);
        let value = objective(&point);
        Vertex {
            point,
            value: if value.is_finite() { value } else { f64::INFINITY },
        }
    };

    let mut simplex: Vec<Vertex> = Vec::with_capacity(n + 1);
    simplex.push(eval(initial.to_vec()));
    for i in 0..n {
        let mut point = initial.to_vec();
        point[i] += if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        simplex.push(eval(point));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.value.total_cmp(&b.value));

        let best = simplex[0].value;
        let worst = simplex[n].value;
        let second_worst = simplex[n - 1].value;

        let centroid = centroid_without_last(&simplex);
        let spread = simplex
            .iter()
            .map(|v| distance(&v.point, &centroid))
            .fold(0.0, f64::max);
        if (worst - best).abs() < config.tolerance || spread < config.tolerance {
            converged = true;
            break;
        }

        let reflected = eval(affine(&centroid, &simplex[n].point, -config.alpha));

        if reflected.value < best {
            let expanded = eval(affine(&centroid, &reflected.point, config.gamma));
            simplex[n] = if expanded.value < reflected.value {
                expanded
            } else {
                reflected
            };
            continue;
        }
        if reflected.value < second_worst {
            simplex[n] = reflected;
            continue;
        }

        let contracted = if reflected.value < worst {
            eval(affine(&centroid, &reflected.point, config.rho))
        } else {
            eval(affine(&centroid, &simplex[n].point, config.rho))
        };
        if contracted.value < worst.min(reflected.value) {
            simplex[n] = contracted;
            continue;
        }

        let anchor = simplex[0].point.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = affine(&anchor, &vertex.point, config.sigma);
            *vertex = eval(shrunk);
        }
    }

    simplex.sort_by(|a, b| a.value.total_cmp(&b.value));
    let best = simplex.swap_remove(0);

    NelderMeadResult {
        optimal_point: best.point,
        optimal_value: best.value,
        iterations,
        converged,
    }
}

/// `origin + t * (towards - origin)`.
fn affine(origin: &[f64], towards: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(towards)
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

/// Centroid of every vertex except the last (worst) one.
fn centroid_without_last(simplex: &[Vertex]) -> Vec<f64> {
    let count = simplex.len() - 1;
    let dims = simplex[0].point.len();
    let mut centroid = vec![0.0; dims];
    for vertex in &simplex[..count] {
        for (c, x) in centroid.iter_mut().zip(&vertex.point) {
            *c += x;
        }
    }
    for c in &mut centroid {
        *c /= count as f64;
    }
    centroid
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn clamp_to_bounds(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn minimizes_quadratic_bowl() {
        let result = nelder_mead(
            |x| (x[0] - 1.5).powi(2) + 2.0 * (x[1] - 0.5).powi(2),
            &[0.0, 0.0],
            None,
            NelderMeadConfig::default(),
        );
        assert!(result.converged);
        assert_relative_eq!(result.optimal_point[0], 1.5, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn respects_bounds() {
        let bounds = [(-0.99, 0.99)];
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[0.0],
            Some(&bounds),
            NelderMeadConfig::default(),
        );
        assert!(result.optimal_point[0] <= 0.99);
        assert_relative_eq!(result.optimal_point[0], 0.99, epsilon = 1e-3);
    }

    #[test]
    fn non_finite_objective_is_avoided() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 0.2).powi(2) },
            &[0.5],
            None,
            NelderMeadConfig::default(),
        );
        assert!(result.optimal_value.is_finite());
        assert_relative_eq!(result.optimal_point[0], 0.2, epsilon = 1e-3);
    }

    #[test]
    fn empty_initial_point() {
        let result = nelder_mead(|_| 0.0, &[], None, NelderMeadConfig::default());
        assert!(!result.converged);
        assert!(result.optimal_point.is_empty());
    }
}
