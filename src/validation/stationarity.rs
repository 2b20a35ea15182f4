//! Augmented Dickey-Fuller unit-root test.
//!
//! Regression with constant:
//! `dy_t = a + b * y_{t-1} + sum_i g_i * dy_{t-i} + e_t`.
//! The null hypothesis is a unit root (`b = 0`); rejecting it means the
//! series is stationary.

use crate::utils::ols::ols_fit;

/// Result of a stationarity test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic (t-ratio of the lagged level coefficient).
    pub statistic: f64,
    /// Approximate p-value.
    pub p_value: f64,
    /// Number of lagged differences used.
    pub lags: usize,
    /// Whether the null is rejected at 5%.
    pub is_stationary: bool,
    /// Critical values at common significance levels.
    pub critical_values: CriticalValues,
}

impl StationarityResult {
    fn undetermined(lags: usize) -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags,
            is_stationary: false,
            critical_values: CriticalValues::default(),
        }
    }
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Default)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

impl CriticalValues {
    /// MacKinnon (2010) response-surface values for the constant-only case.
    fn mackinnon(n_obs: usize) -> Self {
        let t = n_obs.max(1) as f64;
        Self {
            cv_1pct: -3.43035 - 6.5393 / t - 16.786 / (t * t),
            cv_5pct: -2.86154 - 2.8903 / t - 4.234 / (t * t),
            cv_10pct: -2.56677 - 1.5384 / t - 2.809 / (t * t),
        }
    }
}

/// Augmented Dickey-Fuller test.
///
/// `max_lags` defaults to `floor(12 * (n / 100)^(1/4))` (Schwert); the lag
/// order actually used is chosen by AIC over a common estimation sample.
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> StationarityResult {
    let n = series.len();
    if n < 8 || series.iter().any(|v| !v.is_finite()) {
        return StationarityResult::undetermined(0);
    }

    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize;
    let max_lags = max_lags.unwrap_or(schwert).min(n / 2 - 2);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lags {
        let (design, y) = adf_design(series, &diff, lag, max_lags);
        let Ok(fit) = ols_fit(&design, &y) else {
            continue;
        };
        if fit.rss <= 0.0 {
            continue;
        }
        let k = design[0].len() as f64;
        let n_eff = y.len() as f64;
        let aic = n_eff * (fit.rss / n_eff).ln() + 2.0 * k;
        if best.map_or(true, |(_, a)| aic < a) {
            best = Some((lag, aic));
        }
    }

    let Some((lag, _)) = best else {
        return StationarityResult::undetermined(0);
    };

    let (design, y) = adf_design(series, &diff, lag, lag);
    let Ok(fit) = ols_fit(&design, &y) else {
        return StationarityResult::undetermined(lag);
    };
    let se = fit.std_errors[1];
    if se <= 0.0 || !se.is_finite() {
        return StationarityResult::undetermined(lag);
    }

    let statistic = fit.coefficients[1] / se;
    let critical_values = CriticalValues::mackinnon(y.len());
    let is_stationary = statistic < critical_values.cv_5pct;

    StationarityResult {
        statistic,
        p_value: approximate_p_value(statistic, &critical_values),
        lags: lag,
        is_stationary,
        critical_values,
    }
}

/// Rows `[1, y_{t-1}, dy_{t-1}, .., dy_{t-lag}]` for every usable `t`.
///
/// `start` aligns the sample so models with different lag orders are
/// compared on the same observations.
fn adf_design(series: &[f64], diff: &[f64], lag: usize, start: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut design = Vec::with_capacity(diff.len().saturating_sub(start));
    let mut y = Vec::with_capacity(diff.len().saturating_sub(start));

    // diff[t] = series[t + 1] - series[t]
    for t in start..diff.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(1.0);
        row.push(series[t]);
        for i in 1..=lag {
            row.push(diff[t - i]);
        }
        design.push(row);
        y.push(diff[t]);
    }
    (design, y)
}

/// Piecewise-linear interpolation through the critical values.
fn approximate_p_value(statistic: f64, cv: &CriticalValues) -> f64 {
    let knots = [
        (cv.cv_1pct - 1.0, 0.001),
        (cv.cv_1pct, 0.01),
        (cv.cv_5pct, 0.05),
        (cv.cv_10pct, 0.10),
        (-1.6, 0.45),
        (-0.5, 0.85),
        (1.0, 0.99),
    ];
    if statistic <= knots[0].0 {
        return knots[0].1;
    }
    for pair in knots.windows(2) {
        let (x0, p0) = pair[0];
        let (x1, p1) = pair[1];
        if statistic <= x1 {
            return p0 + (p1 - p0) * (statistic - x0) / (x1 - x0);
        }
    }
    knots[knots.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn white_noise_is_stationary() {
        let series = white_noise(200, 7);
        let result = adf_test(&series, None);

        assert!(result.statistic.is_finite());
        assert!(result.is_stationary);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn drifting_random_walk_is_not_stationary() {
        let steps: Vec<f64> = white_noise(200, 11).iter().map(|s| s + 0.5).collect();
        let series: Vec<f64> = steps
            .iter()
            .scan(50.0, |level, s| {
                *level += s;
                Some(*level)
            })
            .collect();

        let result = adf_test(&series, None);
        assert!(result.statistic.is_finite());
        assert!(!result.is_stationary);
    }

    #[test]
    fn short_or_constant_series_is_undetermined() {
        assert!(adf_test(&[1.0, 2.0, 3.0], None).statistic.is_nan());
        let constant = adf_test(&[4.0; 40], None);
        assert!(constant.statistic.is_nan());
        assert!(!constant.is_stationary);
    }

    #[test]
    fn critical_values_are_ordered() {
        let cv = CriticalValues::mackinnon(100);
        assert!(cv.cv_1pct < cv.cv_5pct);
        assert!(cv.cv_5pct < cv.cv_10pct);
    }

    #[test]
    fn p_value_is_monotone_in_statistic() {
        let cv = CriticalValues::mackinnon(100);
        let mut last = 0.0;
        for stat in [-6.0, -3.5, -2.9, -2.6, -1.0, 0.0, 2.0] {
            let p = approximate_p_value(stat, &cv);
            assert!(p >= last);
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
    }
}
