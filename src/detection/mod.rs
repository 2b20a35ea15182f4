//! Periodicity detection.

pub mod fft;

pub use fft::{dominant_period, periodogram, DominantPeriod};
