//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external formats:
//! - `artifacts`: model directory exported by the training pipeline
//! - `sklearn`: evaluators for exported scikit-learn parameters
//! - `csv_dataset`: per-year PEDE CSV exports
//! - `sanitize`: student identifier filtering for logs

pub mod artifacts;
pub mod csv_dataset;
pub mod sanitize;
pub mod sklearn;

pub use artifacts::ArtifactStore;
pub use csv_dataset::{ColumnMap, CsvDataset};
