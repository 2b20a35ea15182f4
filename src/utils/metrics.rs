//! In-sample accuracy of sub-model fits.

/// `1 - sum|actual - predicted| / sum|actual|`, clamped to `[0, 1]`.
///
/// A perfect fit scores 1. An all-zero `actual` scores 1 only when the
/// prediction is also exactly zero; mismatched or empty inputs score 0.
pub fn accuracy_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return 0.0;
    }
    let abs_error: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    let scale: f64 = actual.iter().map(|a| a.abs()).sum();

    if !abs_error.is_finite() {
        return 0.0;
    }
    if scale <= f64::EPSILON {
        return if abs_error <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - abs_error / scale).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_fit_scores_one() {
        let actual = [10.0, 20.0, 30.0];
        assert_relative_eq!(accuracy_score(&actual, &actual), 1.0);
        assert_relative_eq!(accuracy_score(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn accuracy_reflects_relative_error() {
        assert_relative_eq!(accuracy_score(&[100.0, 100.0], &[90.0, 110.0]), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(accuracy_score(&[1.0], &[100.0]), 0.0);
        assert_eq!(accuracy_score(&[1.0], &[f64::NAN]), 0.0);
        assert_eq!(accuracy_score(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(accuracy_score(&[], &[]), 0.0);
        assert_eq!(accuracy_score(&[0.0], &[0.5]), 0.0);
    }
}
