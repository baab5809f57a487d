//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (exported model artifacts,
//! dataset files).

mod dataset;
mod model;

pub use dataset::{DatasetError, DatasetSource};
pub use model::{
    argmax, BundleParts, Classifier, ModelBundle, ModelLoadError, ModelStore, Scaler,
};
