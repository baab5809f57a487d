//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides an interface for:
//! - Dashboard with engine status and dataset figures
//! - Student indicator input
//! - Risk assessment result
//! - Model metrics and feature importance

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::PedeTheme;
