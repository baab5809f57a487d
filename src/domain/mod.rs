//! Domain layer: Core types of the risk engine and the analytics dataset.
//!
//! Pure Rust types with no I/O. Model capabilities (scaler, classifier) live
//! behind the traits in `ports`.

mod features;
mod indicators;
mod metadata;
mod prediction;
mod student;
mod tier;

pub use features::{
    CategoryEncoder, Derivation, DerivationSet, FeatureRule, FeatureSchema, InputKind,
    RequiredInput, SchemaError, V1_BASE_INDICATORS, V1_RATIO_OFFSET,
};
pub use indicators::{nominal_range, IndicatorValue, IndicatorVector, PEDE_INDICATORS, PEDE_RANGE};
pub use metadata::ModelMetadata;
pub use prediction::{
    validate_distribution, Assessment, Prediction, PredictionError, PROBABILITY_SUM_TOLERANCE,
};
pub use student::{Column, Pedra, StudentRecord, DEFASAGEM_RISK_CUTOFF};
pub use tier::{ConfigError, RiskTier, TierSpec, TierTable};
