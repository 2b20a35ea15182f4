//! Linear least squares via the normal equations.
//!
//! Serves two callers: the unit-root regression of the stationarity test
//! (plain OLS with standard errors) and the readout layer of the sequence
//! forecaster (ridge regression with an unpenalized intercept).

use crate::error::{EngineError, Result};

/// Result of an ordinary least squares fit on an explicit design matrix.
#[derive(Debug, Clone)]
pub struct OLSResult {
    /// One coefficient per design column.
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Number of observations.
    pub n_obs: usize,
}

/// Fit `y = X b` by ordinary least squares.
///
/// `design` is row-major; the caller adds an intercept column if wanted.
pub fn ols_fit(design: &[Vec<f64>], y: &[f64]) -> Result<OLSResult> {
    let n = y.len();
    if design.len() != n {
        return Err(EngineError::DimensionMismatch {
            expected: n,
            got: design.len(),
        });
    }
    let k = design.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 || n <= k {
        return Err(EngineError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let (mut xtx, xty) = normal_equations(design, y, k)?;
    for i in 0..k {
        xtx[i][i] += 1e-10;
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        EngineError::ComputationError("OLS failed: design matrix is rank deficient".into())
    })?;

    let rss: f64 = design
        .iter()
        .zip(y)
        .map(|(row, &obs)| {
            let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            (obs - fitted).powi(2)
        })
        .sum();
    let sigma_sq = rss / (n - k) as f64;

    let mut std_errors = Vec::with_capacity(k);
    for j in 0..k {
        let mut unit = vec![0.0; k];
        unit[j] = 1.0;
        let column = solve_symmetric(&xtx, &unit).ok_or_else(|| {
            EngineError::ComputationError("OLS failed: cannot invert X'X".into())
        })?;
        std_errors.push((sigma_sq * column[j]).max(0.0).sqrt());
    }

    Ok(OLSResult {
        coefficients: beta,
        std_errors,
        rss,
        n_obs: n,
    })
}

/// Fitted ridge regression with a separate, unpenalized intercept.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RidgeFit {
    /// Feature weights.
    pub coefficients: Vec<f64>,
    /// Intercept.
    pub intercept: f64,
}

impl RidgeFit {
    /// Predict a single row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Fit `y = b0 + X w` minimizing `|y - b0 - X w|^2 + lambda |w|^2`.
///
/// Features and target are centered first so the intercept is not shrunk.
/// A constant design therefore yields zero weights and `b0 = mean(y)`.
pub fn ridge_fit(design: &[Vec<f64>], y: &[f64], lambda: f64) -> Result<RidgeFit> {
    let n = y.len();
    if n == 0 {
        return Err(EngineError::InsufficientData { needed: 1, got: 0 });
    }
    if design.len() != n {
        return Err(EngineError::DimensionMismatch {
            expected: n,
            got: design.len(),
        });
    }
    if lambda <= 0.0 || !lambda.is_finite() {
        return Err(EngineError::InvalidParameter(format!(
            "ridge penalty must be positive, got {lambda}"
        )));
    }
    let k = design[0].len();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let mut x_mean = vec![0.0; k];
    for row in design {
        if row.len() != k {
            return Err(EngineError::DimensionMismatch {
                expected: k,
                got: row.len(),
            });
        }
        for (m, x) in x_mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    for m in &mut x_mean {
        *m /= n as f64;
    }

    let centered: Vec<Vec<f64>> = design
        .iter()
        .map(|row| row.iter().zip(&x_mean).map(|(x, m)| x - m).collect())
        .collect();
    let y_centered: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

    let (mut xtx, xty) = normal_equations(&centered, &y_centered, k)?;
    for i in 0..k {
        xtx[i][i] += lambda;
    }
    let coefficients = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        EngineError::ComputationError("ridge system is not positive definite".into())
    })?;

    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_mean)
            .map(|(w, m)| w * m)
            .sum::<f64>();

    Ok(RidgeFit {
        coefficients,
        intercept,
    })
}

/// Accumulate `X'X` and `X'y` for a row-major design.
fn normal_equations(design: &[Vec<f64>], y: &[f64], k: usize) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for (row, &obs) in design.iter().zip(y) {
        if row.len() != k {
            return Err(EngineError::DimensionMismatch {
                expected: k,
                got: row.len(),
            });
        }
        for i in 0..k {
            let xi = row[i];
            xty[i] += xi * obs;
            for j in 0..=i {
                xtx[i][j] += xi * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
    }

    Ok((xtx, xty))
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Returns `None` when `a` is not positive definite.
pub(crate) fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum = b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>();
        z[i] = sum / l[i][i];
    }

    // L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum = z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>();
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ols_recovers_exact_line() {
        let design: Vec<Vec<f64>> = (0..20).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| 3.0 + 2.0 * i as f64).collect();

        let fit = ols_fit(&design, &y).unwrap();
        assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 1e-6);
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-6);
        assert!(fit.rss < 1e-8);
        assert_eq!(fit.n_obs, 20);
    }

    #[test]
    fn ols_reports_standard_errors() {
        let design: Vec<Vec<f64>> = (0..30).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..30)
            .map(|i| 1.0 + 0.5 * i as f64 + if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();

        let fit = ols_fit(&design, &y).unwrap();
        assert!(fit.std_errors.iter().all(|se| *se > 0.0 && se.is_finite()));
    }

    #[test]
    fn ols_needs_more_rows_than_columns() {
        let design = vec![vec![1.0, 2.0]];
        assert!(matches!(
            ols_fit(&design, &[1.0]),
            Err(EngineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn ridge_constant_design_predicts_mean() {
        let design = vec![vec![0.5, 0.5]; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let fit = ridge_fit(&design, &y, 1e-3).unwrap();
        assert!(fit.coefficients.iter().all(|w| *w == 0.0));
        assert_relative_eq!(fit.intercept, 4.5, epsilon = 1e-12);
        assert_relative_eq!(fit.predict(&[0.5, 0.5]), 4.5, epsilon = 1e-12);
    }

    #[test]
    fn ridge_fits_linear_relation() {
        let design: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 / 10.0]).collect();
        let y: Vec<f64> = design.iter().map(|r| 1.0 + 4.0 * r[0]).collect();

        let fit = ridge_fit(&design, &y, 1e-8).unwrap();
        assert_relative_eq!(fit.coefficients[0], 4.0, epsilon = 1e-4);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn ridge_rejects_non_positive_penalty() {
        assert!(ridge_fit(&[vec![1.0]], &[1.0], 0.0).is_err());
    }

    #[test]
    fn cholesky_rejects_indefinite_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(solve_symmetric(&a, &[1.0, 1.0]).is_none());
    }
}
