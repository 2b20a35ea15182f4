//! Spectral analysis for seasonal demand patterns.

use rustfft::{num_complex::Complex64, FftPlanner};

/// Compute the FFT of a real-valued signal.
///
/// Only the non-negative frequencies (0 to N/2) are returned since the
/// spectrum of a real signal is symmetric.
pub fn fft_real(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer.truncate(n / 2 + 1);
    buffer
}

/// Periodogram of the demeaned signal as `(period, power)` pairs.
///
/// Power is `|X[k]|^2 / N`; the DC bin and periods below 2 are skipped.
/// Pairs are ordered from the longest period to the shortest.
pub fn periodogram(signal: &[f64]) -> Vec<(usize, f64)> {
    let n = signal.len();
    if n < 4 {
        return Vec::new();
    }

    let mean = signal.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = signal.iter().map(|x| x - mean).collect();
    let spectrum = fft_real(&centered);

    spectrum
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| (n / k, c.norm_sqr() / n as f64))
        .take_while(|&(period, _)| period >= 2)
        .collect()
}

/// Strongest periodic component of a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantPeriod {
    /// Period in samples.
    pub period: usize,
    /// Share of total spectral power at that period, in `[0, 1]`.
    pub strength: f64,
}

/// Find the period carrying the most spectral power.
///
/// Returns `None` when the signal is too short or carries no variance.
pub fn dominant_period(signal: &[f64]) -> Option<DominantPeriod> {
    let psd = periodogram(signal);
    let total: f64 = psd.iter().map(|(_, p)| p).sum();
    if !total.is_finite() || total <= 1e-12 {
        return None;
    }

    // Ties go to the longer period, which comes first.
    let (period, power) = psd
        .iter()
        .copied()
        .fold(None::<(usize, f64)>, |best, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })?;

    Some(DominantPeriod {
        period,
        strength: (power / total).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn fft_of_constant_is_dc_only() {
        let spectrum = fft_real(&[2.0; 8]);
        assert_eq!(spectrum.len(), 5);
        assert_relative_eq!(spectrum[0].re, 16.0, epsilon = 1e-10);
        assert!(spectrum[1..].iter().all(|c| c.norm() < 1e-10));
    }

    #[test]
    fn weekly_sine_has_period_seven() {
        let signal: Vec<f64> = (0..70)
            .map(|i| 10.0 + 3.0 * (2.0 * PI * i as f64 / 7.0).sin())
            .collect();

        let dominant = dominant_period(&signal).unwrap();
        assert_eq!(dominant.period, 7);
        assert!(dominant.strength > 0.9);
    }

    #[test]
    fn constant_signal_has_no_dominant_period() {
        assert!(dominant_period(&[5.0; 30]).is_none());
    }

    #[test]
    fn short_signal_has_empty_periodogram() {
        assert!(periodogram(&[1.0, 2.0, 3.0]).is_empty());
    }
}
