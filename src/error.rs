//! Error types for the anofox-retail engines.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while forecasting stock or ranking products.
///
/// Per-model failures (`ModelFit`, `NumericInstability`) are normally recovered
/// by excluding the model from the ensemble; only total failure or malformed
/// input reaches the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A sub-model could not be fitted.
    #[error("{model} failed to fit: {reason}")]
    ModelFit { model: String, reason: String },

    /// Every forecasting model was excluded.
    #[error("no forecasting model produced output (excluded: {})", excluded.join(", "))]
    NoModelAvailable { excluded: Vec<String> },

    /// A user or product id is not part of the current snapshot.
    #[error("unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    /// A model produced non-finite values.
    #[error("numeric instability in {model}")]
    NumericInstability { model: String },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Model state could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// The batch worker pool could not be built or a task panicked.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl EngineError {
    /// Shorthand for a `ModelFit` error.
    pub fn model_fit(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = EngineError::InsufficientData { needed: 28, got: 5 };
        assert_eq!(err.to_string(), "insufficient data: need at least 28, got 5");

        let err = EngineError::model_fit("arima", "zero variance");
        assert_eq!(err.to_string(), "arima failed to fit: zero variance");

        let err = EngineError::NoModelAvailable {
            excluded: vec!["arima".to_string(), "trees".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no forecasting model produced output (excluded: arima, trees)"
        );

        let err = EngineError::UnknownEntity {
            kind: "user",
            id: "U1".to_string(),
        };
        assert_eq!(err.to_string(), "unknown user: U1");

        let err = EngineError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn json_errors_convert_to_serialization() {
        let err: EngineError = serde_json::from_slice::<Vec<f64>>(b"not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = EngineError::FitRequired;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
