//! Leaky echo-state reservoir.
//!
//! A recurrent layer whose weights are drawn once from a seeded generator
//! and never trained. Only the linear readout on top of the final state is
//! fitted, which keeps training a single ridge regression.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed random recurrent layer with a single input.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservoir {
    input_weights: Vec<f64>,
    bias: Vec<f64>,
    /// Row-major `units x units` recurrent matrix.
    recurrent: Vec<Vec<f64>>,
    leak_rate: f64,
}

impl Reservoir {
    /// Draw a reservoir.
    ///
    /// The recurrent matrix is rescaled so its largest absolute row sum
    /// equals `recurrent_norm`; below one this guarantees the echo-state
    /// property for `tanh` units.
    pub fn new(units: usize, recurrent_norm: f64, input_scale: f64, leak_rate: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let input_weights: Vec<f64> = (0..units)
            .map(|_| rng.gen_range(-input_scale..=input_scale))
            .collect();
        let bias: Vec<f64> = (0..units).map(|_| rng.gen_range(-0.1..=0.1)).collect();

        let mut recurrent: Vec<Vec<f64>> = (0..units)
            .map(|_| (0..units).map(|_| rng.gen_range(-1.0..=1.0)).collect())
            .collect();
        let inf_norm = recurrent
            .iter()
            .map(|row| row.iter().map(|w| w.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        if inf_norm > 0.0 {
            let factor = recurrent_norm / inf_norm;
            for w in recurrent.iter_mut().flatten() {
                *w *= factor;
            }
        }

        Self {
            input_weights,
            bias,
            recurrent,
            leak_rate: leak_rate.clamp(f64::EPSILON, 1.0),
        }
    }

    /// Number of units.
    pub fn units(&self) -> usize {
        self.bias.len()
    }

    /// Largest absolute row sum of the recurrent matrix.
    pub fn recurrent_norm(&self) -> f64 {
        self.recurrent
            .iter()
            .map(|row| row.iter().map(|w| w.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// Advance the state by one input value.
    pub fn forward_step(&self, input: f64, state: &[f64]) -> Vec<f64> {
        let a = self.leak_rate;
        self.recurrent
            .iter()
            .zip(&self.input_weights)
            .zip(&self.bias)
            .zip(state)
            .map(|(((row, w_in), b), &x)| {
                let recurrent: f64 = row.iter().zip(state).map(|(w, s)| w * s).sum();
                (1.0 - a) * x + a * (w_in * input + b + recurrent).tanh()
            })
            .collect()
    }

    /// Final state after feeding a whole window from a zero state.
    pub fn forward_sequence(&self, window: &[f64]) -> Vec<f64> {
        window
            .iter()
            .fold(vec![0.0; self.units()], |state, &u| self.forward_step(u, &state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recurrent_matrix_is_rescaled() {
        let reservoir = Reservoir::new(32, 0.9, 0.5, 0.3, 42);
        assert_eq!(reservoir.units(), 32);
        assert_relative_eq!(reservoir.recurrent_norm(), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn same_seed_same_reservoir() {
        assert_eq!(
            Reservoir::new(16, 0.9, 0.5, 0.3, 7),
            Reservoir::new(16, 0.9, 0.5, 0.3, 7)
        );
        assert_ne!(
            Reservoir::new(16, 0.9, 0.5, 0.3, 7),
            Reservoir::new(16, 0.9, 0.5, 0.3, 8)
        );
    }

    #[test]
    fn states_stay_bounded() {
        let reservoir = Reservoir::new(24, 0.9, 0.5, 0.5, 1);
        let window: Vec<f64> = (0..200).map(|i| (i as f64 * 0.3).sin()).collect();
        let state = reservoir.forward_sequence(&window);
        assert_eq!(state.len(), 24);
        assert!(state.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn identical_windows_give_identical_states() {
        let reservoir = Reservoir::new(8, 0.9, 0.5, 0.3, 3);
        let window = [0.1, 0.4, 0.2];
        assert_eq!(reservoir.forward_sequence(&window), reservoir.forward_sequence(&window));
    }
}
