//! Forecasting sub-models and their registry.

mod traits;

pub mod arima;
pub mod ensemble;
pub mod sequence;
pub mod tree;

pub use arima::{ClassicalConfig, ClassicalForecaster};
pub use ensemble::{Combination, ForecastCombiner};
pub use sequence::{SequenceConfig, SequenceForecaster};
pub use traits::{BoxedForecaster, Forecaster, ModelRegistry, ModelSpec, TrainingData};
pub use tree::{TreeConfig, TreeEnsembleForecaster};

/// Registry of the three stock forecasters with the given configurations.
///
/// Models are fitted in registration order: classical, sequence, trees.
pub fn default_registry(classical: ClassicalConfig, sequence: SequenceConfig, trees: TreeConfig) -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register(ModelSpec::new(ClassicalForecaster::NAME, move || {
        Box::new(ClassicalForecaster::new(classical))
    }));
    registry.register(ModelSpec::new(SequenceForecaster::NAME, move || {
        Box::new(SequenceForecaster::new(sequence))
    }));
    registry.register(ModelSpec::new(TreeEnsembleForecaster::NAME, move || {
        Box::new(TreeEnsembleForecaster::new(trees))
    }));
    registry
}
