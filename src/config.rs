//! Runtime configuration read from `PEDE_*` environment variables.
//!
//! Invalid values fall back to their defaults. The fallbacks are kept as
//! warnings so they can be logged once the subscriber is up.

use std::path::PathBuf;

pub const MODEL_DIR_ENV: &str = "PEDE_MODEL_DIR";
pub const DATA_DIR_ENV: &str = "PEDE_DATA_DIR";
pub const DATASET_YEARS_ENV: &str = "PEDE_DATASET_YEARS";
pub const REFERENCE_YEAR_ENV: &str = "PEDE_REFERENCE_YEAR";
pub const LOG_MODE_ENV: &str = "PEDE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "PEDE_LOG_FILE";
pub const SANITIZE_MAX_BYTES_ENV: &str = "PEDE_SANITIZE_MAX_BYTES";

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_LOG_FILE: &str = "data/pede-risk.log";
const DEFAULT_YEARS: [u16; 3] = [2022, 2023, 2024];

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    File,
    Stdout,
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise.
    Auto,
}

impl LogMode {
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Ascending, de-duplicated.
    pub dataset_years: Vec<u16>,
    /// Year shown on the dashboard headline.
    pub reference_year: u16,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Values that were rejected and replaced by defaults.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            dataset_years: DEFAULT_YEARS.to_vec(),
            reference_year: DEFAULT_YEARS[DEFAULT_YEARS.len() - 1],
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            warnings: Vec::new(),
        }
    }
}

fn parse_years(raw: &str) -> Option<Vec<u16>> {
    let mut years = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().ok())
        .collect::<Option<Vec<u16>>>()?;
    if years.is_empty() {
        return None;
    }
    years.sort_unstable();
    years.dedup();
    Some(years)
}

impl AppConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup` (environment-free for tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var(MODEL_DIR_ENV) {
            cfg.model_dir = PathBuf::from(v);
        }
        if let Some(v) = var(DATA_DIR_ENV) {
            cfg.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var(LOG_FILE_ENV) {
            cfg.log_file = PathBuf::from(v);
        }

        if let Some(v) = var(DATASET_YEARS_ENV) {
            match parse_years(&v) {
                Some(years) => cfg.dataset_years = years,
                None => cfg
                    .warnings
                    .push(format!("{DATASET_YEARS_ENV}={v:?} is invalid, using defaults")),
            }
        }
        cfg.reference_year = cfg
            .dataset_years
            .last()
            .copied()
            .unwrap_or(cfg.reference_year);

        if let Some(v) = var(REFERENCE_YEAR_ENV) {
            match v.parse::<u16>() {
                Ok(year) => cfg.reference_year = year,
                Err(_) => cfg
                    .warnings
                    .push(format!("{REFERENCE_YEAR_ENV}={v:?} is invalid, using {}", cfg.reference_year)),
            }
        }

        if let Some(v) = var(LOG_MODE_ENV) {
            cfg.log_mode = match v.to_ascii_lowercase().as_str() {
                "file" => LogMode::File,
                "stdout" => LogMode::Stdout,
                "auto" => LogMode::Auto,
                _ => {
                    cfg.warnings
                        .push(format!("{LOG_MODE_ENV}={v:?} is invalid, using auto"));
                    LogMode::Auto
                }
            };
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config_from(&[]);
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.dataset_years, vec![2022, 2023, 2024]);
        assert_eq!(cfg.reference_year, 2024);
        assert_eq!(cfg.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_overrides() {
        let cfg = config_from(&[
            (MODEL_DIR_ENV, "/srv/model"),
            (DATASET_YEARS_ENV, "2024, 2022,2024"),
            (LOG_MODE_ENV, "STDOUT"),
        ]);
        assert_eq!(cfg.model_dir, PathBuf::from("/srv/model"));
        assert_eq!(cfg.dataset_years, vec![2022, 2024]);
        assert_eq!(cfg.reference_year, 2024);
        assert_eq!(cfg.log_mode, LogMode::Stdout);
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn test_reference_year_follows_last_year() {
        let cfg = config_from(&[(DATASET_YEARS_ENV, "2021,2022")]);
        assert_eq!(cfg.reference_year, 2022);

        let cfg = config_from(&[(DATASET_YEARS_ENV, "2021,2022"), (REFERENCE_YEAR_ENV, "2021")]);
        assert_eq!(cfg.reference_year, 2021);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config_from(&[
            (DATASET_YEARS_ENV, "2022,abc"),
            (REFERENCE_YEAR_ENV, "next"),
            (LOG_MODE_ENV, "syslog"),
        ]);
        assert_eq!(cfg.dataset_years, vec![2022, 2023, 2024]);
        assert_eq!(cfg.reference_year, 2024);
        assert_eq!(cfg.log_mode, LogMode::Auto);
        assert_eq!(cfg.warnings.len(), 3);
    }

    #[test]
    fn test_log_mode_auto() {
        assert!(LogMode::Auto.use_file(true));
        assert!(!LogMode::Auto.use_file(false));
        assert!(LogMode::File.use_file(false));
    }
}
