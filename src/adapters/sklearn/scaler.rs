//! Standard scaler exported as `scaler.json`.

use serde::{Deserialize, Serialize};

use crate::domain::PredictionError;
use crate::ports::Scaler;

/// Affine per-feature transform `(x - center) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(alias = "mean")]
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Identity transform over `dim` features.
    #[must_use]
    pub fn identity(dim: usize) -> Self {
        Self {
            center: vec![0.0; dim],
            scale: vec![1.0; dim],
        }
    }

    /// Check the exported parameters.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.center.len() != self.scale.len() {
            return Err(format!(
                "center has {} entries, scale has {}",
                self.center.len(),
                self.scale.len()
            ));
        }
        if let Some(i) = self.center.iter().position(|c| !c.is_finite()) {
            return Err(format!("center[{i}] is not finite"));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(format!("scale[{i}] must be finite and non-zero"));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn dim(&self) -> usize {
        self.center.len()
    }

    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.dim() {
            return Err(PredictionError::DimensionMismatch {
                expected: self.dim(),
                actual: x.len(),
            });
        }
        Ok(x
            .iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(v, (c, s))| (v - c) / s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler {
            center: vec![5.0, 2.0],
            scale: vec![2.0, 0.5],
        };
        assert_eq!(scaler.transform(&[7.0, 1.0]).unwrap(), vec![1.0, -2.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = StandardScaler::identity(3);
        assert_eq!(
            scaler.transform(&[1.0]),
            Err(PredictionError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn test_mean_alias_and_validation() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean": [1.0], "scale": [0.0]}"#).expect("parses");
        assert_eq!(scaler.center, vec![1.0]);
        assert!(scaler.validate().is_err());

        let ragged = StandardScaler {
            center: vec![0.0, 0.0],
            scale: vec![1.0],
        };
        assert!(ragged.validate().is_err());
        assert!(StandardScaler::identity(4).validate().is_ok());
    }
}
