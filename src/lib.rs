//! # PEDE Risk
//!
//! Educational risk inference over PEDE indicators (Passos Mágicos).
//!
//! This crate provides:
//! - A risk engine mapping a student's indicators to a risk probability and tier
//! - Descriptive analytics over the yearly PEDE dataset
//! - Terminal UI for local-only use
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (indicators, feature schema, tiers, predictions, student records)
//! - `ports`: Trait definitions for model artifacts and dataset sources
//! - `adapters`: Concrete implementations (artifact directory, sklearn evaluators, CSV)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{Assessment, IndicatorVector, Prediction, RiskTier};

/// Result type for PEDE Risk operations
pub type Result<T> = std::result::Result<T, PedeError>;

/// Main error type for PEDE Risk
#[derive(Debug, thiserror::Error)]
pub enum PedeError {
    #[error("Model load failed: {0}")]
    ModelLoad(#[from] ports::ModelLoadError),

    #[error("Prediction rejected: {0}")]
    Prediction(#[from] domain::PredictionError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] domain::ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] ports::DatasetError),

    #[error("Predictions unavailable: {0}")]
    PredictionsUnavailable(String),

    #[error("Invalid student data: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
