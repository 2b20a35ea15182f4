//! Trailing window statistics and gap filling.
//!
//! Warm-up positions (fewer than `window` values available) are `NaN`, the
//! same convention the feature table uses for every missing value.

/// Trailing rolling mean.
pub fn rolling_mean(series: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(series, window, |segment| {
        segment.iter().sum::<f64>() / segment.len() as f64
    })
}

/// Trailing rolling standard deviation (sample, n-1 denominator).
pub fn rolling_std(series: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return vec![f64::NAN; series.len()];
    }
    rolling_apply(series, window, |segment| {
        let mean = segment.iter().sum::<f64>() / segment.len() as f64;
        let ss: f64 = segment.iter().map(|x| (x - mean).powi(2)).sum();
        (ss / (segment.len() - 1) as f64).sqrt()
    })
}

/// Value `lag` steps back, `NaN` before the series has that much history.
pub fn lagged(series: &[f64], lag: usize) -> Vec<f64> {
    (0..series.len())
        .map(|i| if i >= lag { series[i - lag] } else { f64::NAN })
        .collect()
}

fn rolling_apply<F>(series: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = series.len();
    if window == 0 {
        return vec![f64::NAN; n];
    }
    (0..n)
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                f(&series[i + 1 - window..=i])
            }
        })
        .collect()
}

/// Replace `NaN` with the last seen value, then fill any leading gap with
/// the first seen value.
///
/// Returns `false` when the series has no finite value at all; it is then
/// left untouched.
pub fn fill_forward_backward(series: &mut [f64]) -> bool {
    let Some(first_valid) = series.iter().position(|v| !v.is_nan()) else {
        return false;
    };

    let mut last = series[first_valid];
    for value in series.iter_mut().skip(first_valid) {
        if value.is_nan() {
            *value = last;
        } else {
            last = *value;
        }
    }

    let seed = series[first_valid];
    for value in series.iter_mut().take(first_valid) {
        *value = seed;
    }
    true
}
