//! SIMD-accelerated reductions via Trueno (f32 internal).
//!
//! Used by the similarity kernels of the recommendation engine, where
//! ~7 significant digits are plenty for ranking. Statistics that feed
//! stock metrics stay in plain `f64`.
//!
//! # Example
//!
//! ```
//! use anofox_retail::simd;
//!
//! let a = vec![1.0, 2.0, 3.0];
//! let b = vec![4.0, 5.0, 6.0];
//! assert!((simd::dot(&a, &b) - 32.0).abs() < 1e-5);
//! assert!((simd::cosine(&a, &a) - 1.0).abs() < 1e-6);
//! ```

use trueno::Vector;

#[inline]
fn to_f32(data: &[f64]) -> Vec<f32> {
    data.iter().map(|&x| x as f32).collect()
}

/// Sum of all elements.
#[inline]
pub fn sum(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let f32_data = to_f32(data);
    Vector::from_slice(&f32_data)
        .sum()
        .map(|s| s as f64)
        .unwrap_or_else(|_| data.iter().sum())
}

/// Sum of squared elements (x·x).
#[inline]
pub fn sum_of_squares(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let f32_data = to_f32(data);
    Vector::from_slice(&f32_data)
        .sum_of_squares()
        .map(|s| s as f64)
        .unwrap_or_else(|_| data.iter().map(|x| x * x).sum())
}

/// Dot product of two equally long vectors.
///
/// Slices of different length are truncated to the shorter one.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let a_f32 = to_f32(&a[..n]);
    let b_f32 = to_f32(&b[..n]);
    let va = Vector::from_slice(&a_f32);
    let vb = Vector::from_slice(&b_f32);
    va.dot(&vb)
        .map(|s| s as f64)
        .unwrap_or_else(|_| a[..n].iter().zip(&b[..n]).map(|(x, y)| x * y).sum())
}

/// Euclidean norm.
#[inline]
pub fn norm(data: &[f64]) -> f64 {
    sum_of_squares(data).sqrt()
}

/// Cosine similarity of two dense vectors; zero when either has no mass.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let denom = norm(a) * norm(b);
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reductions_match_scalar_versions() {
        let data: Vec<f64> = (1..=100).map(|i| i as f64 * 0.5).collect();
        let scalar_sum: f64 = data.iter().sum();
        let scalar_sq: f64 = data.iter().map(|x| x * x).sum();

        assert_relative_eq!(sum(&data), scalar_sum, epsilon = 1e-3);
        assert_relative_eq!(sum_of_squares(&data), scalar_sq, max_relative = 1e-5);
    }

    #[test]
    fn empty_inputs_reduce_to_zero() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(sum_of_squares(&[]), 0.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let a = [3.0, 0.0, 1.0, 2.0];
        let b = [1.0, 4.0, 0.0, 2.0];
        assert_relative_eq!(cosine(&a, &b), cosine(&b, &a), epsilon = 1e-12);
        assert!(cosine(&a, &b) <= 1.0);
        assert_relative_eq!(cosine(&a, &a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
