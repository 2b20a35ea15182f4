//! ARIMA (Autoregressive Integrated Moving Average) estimated by conditional
//! sum of squares.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::arima::diff::{difference, integrate};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

impl ARIMASpec {
    /// Create a new ARIMA specification.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Total number of parameters.
    pub fn num_params(&self) -> usize {
        self.p + self.q + 1 // AR + MA + intercept
    }

    /// Shortest series this order can be estimated on.
    pub fn min_length(&self) -> usize {
        self.d + self.p.max(self.q) + self.num_params() + 2
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl std::fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Fitted ARIMA(p, d, q) model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ARIMA {
    spec: ARIMASpec,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series.
    intercept: f64,
    /// Input series, needed for integration.
    original: Vec<f64>,
    differenced: Vec<f64>,
    /// One-step residuals on the differenced scale; zero during warm-up.
    residuals: Vec<f64>,
    residual_variance: f64,
}

impl ARIMA {
    /// Estimate an ARIMA model of the given order.
    ///
    /// # Errors
    /// `InsufficientData` when the series is shorter than
    /// [`ARIMASpec::min_length`]; `ComputationError` when the optimizer
    /// ends on non-finite parameters.
    pub fn fit(spec: ARIMASpec, values: &[f64]) -> Result<Self> {
        let needed = spec.min_length();
        if values.len() < needed {
            return Err(EngineError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let differenced = difference(values, spec.d);
        let (intercept, ar, ma) = estimate_parameters(spec, &differenced);
        if !intercept.is_finite() || ar.iter().chain(&ma).any(|c| !c.is_finite()) {
            return Err(EngineError::ComputationError(format!(
                "{spec} estimation produced non-finite parameters"
            )));
        }

        let residuals = one_step_residuals(&differenced, spec, intercept, &ar, &ma);
        let warm_up = spec.p.max(spec.q);
        let valid = &residuals[warm_up..];
        let residual_variance = valid.iter().map(|r| r * r).sum::<f64>() / valid.len().max(1) as f64;
        if !residual_variance.is_finite() {
            return Err(EngineError::ComputationError(format!(
                "{spec} residual variance is not finite"
            )));
        }

        Ok(Self {
            spec,
            ar_coefficients: ar,
            ma_coefficients: ma,
            intercept,
            original: values.to_vec(),
            differenced,
            residuals,
            residual_variance,
        })
    }

    /// Get the model specification.
    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    /// Get AR coefficients.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Get MA coefficients.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Get the intercept.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Variance of the one-step residuals.
    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    /// One-step residuals after the warm-up period.
    ///
    /// For one-step-ahead predictions the error is the same on the
    /// differenced and on the original scale.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals[self.spec.p.max(self.spec.q)..]
    }

    /// Observed values the residuals of [`residuals`](Self::residuals)
    /// belong to.
    pub fn residual_targets(&self) -> &[f64] {
        let count = self.residuals().len();
        &self.original[self.original.len() - count..]
    }

    /// Forecast `horizon` steps on the original scale.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        if horizon == 0 {
            return Vec::new();
        }
        let p = self.spec.p;
        let q = self.spec.q;

        let mut extended = self.differenced.clone();
        let mut errors = self.residuals.clone();

        for _ in 0..horizon {
            let t = extended.len();
            let mut pred = self.intercept;
            for i in 0..p.min(t) {
                pred += self.ar_coefficients[i] * (extended[t - 1 - i] - self.intercept);
            }
            for i in 0..q.min(t) {
                pred += self.ma_coefficients[i] * errors[t - 1 - i];
            }
            extended.push(pred);
            errors.push(0.0);
        }

        let on_diff_scale = extended[self.differenced.len()..].to_vec();
        if self.spec.d > 0 {
            integrate(&on_diff_scale, &self.original, self.spec.d)
        } else {
            on_diff_scale
        }
    }
}

/// Conditional sum of squares for given parameters.
fn calculate_css(diff_series: &[f64], spec: ARIMASpec, ar: &[f64], ma: &[f64], intercept: f64) -> f64 {
    let start = spec.p.max(spec.q);
    if diff_series.len() <= start {
        return f64::MAX;
    }
    one_step_residuals(diff_series, spec, intercept, ar, ma)[start..]
        .iter()
        .map(|e| e * e)
        .sum()
}

/// Estimate intercept, AR and MA coefficients by minimizing the CSS.
fn estimate_parameters(spec: ARIMASpec, diff_series: &[f64]) -> (f64, Vec<f64>, Vec<f64>) {
    let (p, q) = (spec.p, spec.q);
    let mean = diff_series.iter().sum::<f64>() / diff_series.len() as f64;
    if p == 0 && q == 0 {
        return (mean, Vec::new(), Vec::new());
    }

    let mut initial = vec![0.0; p + q + 1];
    initial[0] = mean;
    for i in 0..p {
        initial[1 + i] = 0.1 / (i + 1) as f64;
    }
    for i in 0..q {
        initial[1 + p + i] = 0.1 / (i + 1) as f64;
    }

    // Coefficients stay inside the stationary / invertible region.
    let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
    bounds.extend(std::iter::repeat((-0.99, 0.99)).take(p + q));

    let result = nelder_mead(
        |params| calculate_css(diff_series, spec, &params[1..1 + p], &params[1 + p..], params[0]),
        &initial,
        Some(&bounds),
        NelderMeadConfig {
            max_iter: 1000,
            tolerance: 1e-8,
            ..Default::default()
        },
    );

    let params = result.optimal_point;
    (params[0], params[1..1 + p].to_vec(), params[1 + p..].to_vec())
}

fn one_step_residuals(diff_series: &[f64], spec: ARIMASpec, intercept: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let n = diff_series.len();
    let start = spec.p.max(spec.q);
    let mut residuals = vec![0.0; n];
    for t in start..n {
        let mut pred = intercept;
        for i in 0..spec.p {
            pred += ar[i] * (diff_series[t - 1 - i] - intercept);
        }
        for i in 0..spec.q {
            pred += ma[i] * residuals[t - 1 - i];
        }
        residuals[t] = diff_series[t] - pred;
    }
    residuals
}
