//! Prediction and assessment records.

use serde::{Deserialize, Serialize};

use super::tier::RiskTier;

/// Tolerance for the probability vector summing to one.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Per-call prediction failures. Recoverable; reported verbatim to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Missing required feature: {0}")]
    MissingFeature(String),

    #[error("Unknown category {value:?} for feature {feature}")]
    UnknownCategory { feature: String, value: String },

    #[error("Feature {0} expects a numeric value")]
    ExpectedNumeric(String),

    #[error("Feature {0} expects a categorical value")]
    ExpectedCategory(String),

    #[error("Feature {0} is not a finite number")]
    NonFinite(String),

    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Classifier returned invalid probabilities: {0}")]
    InvalidProbabilities(String),

    #[error("Probability {0} outside [0, 1]")]
    InvalidProbability(f64),
}

/// Output of one forward pass through the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Label of the most probable class.
    pub predicted_class: i64,

    /// Class labels, aligned with `probabilities`.
    pub classes: Vec<i64>,

    /// Probability per class (sums to 1).
    pub probabilities: Vec<f64>,

    /// Probability mass of the bundle's risk class.
    pub risk_probability: f64,

    /// `risk_probability >= threshold`, when the bundle declares a threshold.
    pub at_risk: Option<bool>,
}

impl Prediction {
    /// Probability of the predicted class.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.classes
            .iter()
            .position(|c| *c == self.predicted_class)
            .and_then(|i| self.probabilities.get(i).copied())
            .unwrap_or(0.0)
    }
}

/// Check that a probability vector is a distribution over `n_classes`.
///
/// # Errors
/// Returns `PredictionError::InvalidProbabilities` describing the first violation.
pub fn validate_distribution(probabilities: &[f64], n_classes: usize) -> Result<(), PredictionError> {
    if probabilities.len() != n_classes {
        return Err(PredictionError::InvalidProbabilities(format!(
            "expected {n_classes} entries, got {}",
            probabilities.len()
        )));
    }
    if let Some(p) = probabilities
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(PredictionError::InvalidProbabilities(format!(
            "entry {p} outside [0, 1]"
        )));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(PredictionError::InvalidProbabilities(format!(
            "entries sum to {sum}"
        )));
    }
    Ok(())
}

/// One assessed student: prediction, tier and guidance.
///
/// Held in memory for the session summary; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub prediction: Prediction,
    pub tier: RiskTier,
    /// Display label of the predicted class, when the bundle names its classes.
    pub class_label: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    #[must_use]
    pub fn new(prediction: Prediction, tier: RiskTier, class_label: Option<String>) -> Self {
        Self {
            id: uuid_v4(),
            prediction,
            tier,
            class_label,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Random UUID v4 from a ChaCha20 CSPRNG seeded by the OS.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TierTable;

    fn binary(p: f64) -> Prediction {
        Prediction {
            predicted_class: i64::from(p >= 0.5),
            classes: vec![0, 1],
            probabilities: vec![1.0 - p, p],
            risk_probability: p,
            at_risk: None,
        }
    }

    #[test]
    fn test_confidence_is_probability_of_predicted_class() {
        assert!((binary(0.8).confidence() - 0.8).abs() < 1e-12);
        assert!((binary(0.3).confidence() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_validate_distribution() {
        assert!(validate_distribution(&[0.2, 0.8], 2).is_ok());
        assert!(validate_distribution(&[0.2, 0.8], 3).is_err());
        assert!(validate_distribution(&[0.5, 0.6], 2).is_err());
        assert!(validate_distribution(&[-0.1, 1.1], 2).is_err());
        assert!(validate_distribution(&[f64::NAN, 1.0], 2).is_err());
        assert!(validate_distribution(&[0.1, 0.2, 0.7 + 5e-7], 3).is_ok());
    }

    #[test]
    fn test_assessment_ids_are_unique() {
        let tier = TierTable::default_four_tier()
            .classify(0.8)
            .expect("in range")
            .clone();
        let a = Assessment::new(binary(0.8), tier.clone(), None);
        let b = Assessment::new(binary(0.8), tier, None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }
}
