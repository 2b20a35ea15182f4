//! Feature engineering over stock and sales history.

pub mod engineer;

pub use engineer::{
    ExternalFactor, ExternalFactors, FeatureEngineer, FeatureTable, FeatureVector, STOCK_SLOT,
};
