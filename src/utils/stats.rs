//! Statistical utility functions.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Population standard deviation (n denominator).
///
/// Returns 0 for an empty slice so interval widths collapse instead of
/// turning into NaN.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// The last `n` values of a slice (the whole slice when shorter).
pub fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// True when all values are finite and no two differ by more than `tol`.
pub fn is_constant(values: &[f64], tol: f64) -> bool {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values.is_empty() || (max - min).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sample_and_population_spread() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(population_std(&values), 2.0);
        assert_relative_eq!(variance(&values), 32.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(mean(&[]).is_nan());
        assert!(variance(&[1.0]).is_nan());
        assert_eq!(population_std(&[]), 0.0);
        assert_eq!(population_std(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn tail_clamps_to_length() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(tail(&values, 2), &[2.0, 3.0]);
        assert_eq!(tail(&values, 10), &values);
    }

    #[test]
    fn constant_detection() {
        assert!(is_constant(&[5.0, 5.0, 5.0], 1e-12));
        assert!(!is_constant(&[5.0, 5.1], 1e-12));
    }
}
