//! Series transforms used by feature engineering and the sequence model.

pub mod scale;
pub mod window;

pub use scale::{normalize, ScaleParams, ScaleResult};
pub use window::{fill_forward_backward, lagged, rolling_mean, rolling_std};
