//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod analytics;
mod engine;
mod registry;

pub use analytics::{pearson, AnalyticsService, CorrelationMatrix, TrendPoint, YearSummary};
pub use engine::{classify_tier, predict, RiskEngine};
pub use registry::ModelRegistry;
