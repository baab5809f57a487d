//! Dataset port: Source of per-year student records for the analytics views.

use crate::domain::StudentRecord;

/// Failure to read one year of the dataset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("No dataset for year {0}")]
    MissingYear(u16),

    #[error("Failed to read dataset {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Malformed dataset for year {year}: {reason}")]
    Malformed { year: u16, reason: String },
}

/// Trait for loading student-year observations.
///
/// Implementations normalize their column naming so that every year yields
/// the same `StudentRecord` shape.
pub trait DatasetSource: Send + Sync {
    /// Years this source is configured to serve, ascending.
    fn years(&self) -> Vec<u16>;

    /// Load all records for one year.
    ///
    /// # Errors
    /// Returns `DatasetError::MissingYear` if the year has no data, or another
    /// variant if the data cannot be read.
    fn load_year(&self, year: u16) -> Result<Vec<StudentRecord>, DatasetError>;
}
