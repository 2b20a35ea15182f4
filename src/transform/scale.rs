//! Min-max scaling with an invertible record of the parameters used.

use serde::{Deserialize, Serialize};

/// Result of a scaling transform, containing parameters for inverse transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleResult {
    /// Transformed data
    pub data: Vec<f64>,
    /// Parameters used for the transform.
    pub params: ScaleParams,
}

/// Offset and scale of an affine transform `(x - center) / scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    /// Value mapped to zero.
    pub center: f64,
    /// Divisor; never zero.
    pub scale: f64,
}

impl ScaleParams {
    /// Map a raw value into the scaled space.
    pub fn forward(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }

    /// Map a scaled value back to the raw space.
    pub fn inverse(&self, value: f64) -> f64 {
        value * self.scale + self.center
    }
}

impl ScaleResult {
    /// Inverse transform to recover original scale.
    pub fn inverse(&self) -> Vec<f64> {
        self.data.iter().map(|&x| self.params.inverse(x)).collect()
    }
}

/// Normalize data to [0, 1] range (min-max normalization).
///
/// A constant series maps to all zeros with unit scale, so its inverse is
/// exact.
pub fn normalize(series: &[f64]) -> ScaleResult {
    if series.is_empty() {
        return ScaleResult {
            data: Vec::new(),
            params: ScaleParams {
                center: 0.0,
                scale: 1.0,
            },
        };
    }

    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let params = ScaleParams {
        center: min,
        scale: if range < 1e-10 { 1.0 } else { range },
    };
    let data = series.iter().map(|&x| params.forward(x)).collect();

    ScaleResult { data, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_maps_to_unit_interval() {
        let result = normalize(&[10.0, 20.0, 15.0]);
        assert_eq!(result.data, vec![0.0, 1.0, 0.5]);
        assert_relative_eq!(result.params.inverse(0.5), 15.0);
    }

    #[test]
    fn normalize_round_trips() {
        let series = [3.0, -1.0, 7.5, 2.25];
        let result = normalize(&series);
        for (a, b) in result.inverse().iter().zip(&series) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_series_is_exactly_invertible() {
        let result = normalize(&[100.0; 5]);
        assert!(result.data.iter().all(|&x| x == 0.0));
        assert_eq!(result.params.scale, 1.0);
        assert_eq!(result.params.inverse(0.0), 100.0);
    }
}
