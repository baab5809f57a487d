//! PEDE Risk: Educational risk assessment terminal.
//!
//! Main entry point for the terminal application.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pede_risk::adapters::sanitize::SanitizingMakeWriter;
use pede_risk::config::AppConfig;
use pede_risk::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env();

    // Writing logs to the terminal corrupts the TUI (alternate screen), so an
    // interactive session logs to a file unless told otherwise.
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = if config.log_mode.use_file(interactive) {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        "Starting PEDE Risk (models={:?}, data={:?}, years={:?})",
        config.model_dir,
        config.data_dir,
        config.dataset_years
    );

    let mut app = App::new(config)?;
    app.run()?;

    tracing::info!("PEDE Risk shutdown complete.");
    Ok(())
}
