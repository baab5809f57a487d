//! Logistic regression evaluator.

use serde::{Deserialize, Serialize};

use crate::domain::PredictionError;
use crate::ports::Classifier;

/// Fitted logistic regression.
///
/// Binary models carry one coefficient row (probability of the second class
/// is the sigmoid of the decision value). Multinomial models carry one row
/// per class and use softmax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<i64>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = z.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

impl LogisticRegression {
    /// Check shapes and values of the exported parameters.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let k = self.classes.len();
        if k < 2 {
            return Err(format!("{k} classes, need at least 2"));
        }
        let expected_rows = if k == 2 { 1 } else { k };
        if self.coefficients.len() != expected_rows {
            return Err(format!(
                "{} coefficient rows for {k} classes, expected {expected_rows}",
                self.coefficients.len()
            ));
        }
        if self.intercepts.len() != expected_rows {
            return Err(format!(
                "{} intercepts for {k} classes, expected {expected_rows}",
                self.intercepts.len()
            ));
        }
        let width = self.coefficients[0].len();
        if width == 0 {
            return Err("coefficient rows are empty".to_string());
        }
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err("ragged coefficient rows".to_string());
        }
        let finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .all(|v| v.is_finite());
        if !finite {
            return Err("non-finite coefficient or intercept".to_string());
        }
        Ok(())
    }

    fn decision(&self, row: usize, x: &[f64]) -> f64 {
        self.coefficients[row]
            .iter()
            .zip(x)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercepts[row]
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.n_features() {
            return Err(PredictionError::DimensionMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        if self.classes.len() == 2 {
            let p = sigmoid(self.decision(0, x));
            return Ok(vec![1.0 - p, p]);
        }
        let z: Vec<f64> = (0..self.coefficients.len())
            .map(|row| self.decision(row, x))
            .collect();
        Ok(softmax(&z))
    }

    fn name(&self) -> &str {
        "LogisticRegression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> LogisticRegression {
        LogisticRegression {
            classes: vec![0, 1],
            coefficients: vec![vec![1.0, -2.0]],
            intercepts: vec![0.5],
        }
    }

    #[test]
    fn test_binary_matches_sigmoid() {
        let model = binary();
        // z = 1*1 - 2*0.25 + 0.5 = 1.0
        let proba = model.predict_proba(&[1.0, 0.25]).unwrap();
        let expected = 1.0 / (1.0 + (-1.0f64).exp());
        assert!((proba[1] - expected).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0, 0.25]).unwrap(), 1);
        assert_eq!(model.predict(&[-5.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_multinomial_softmax() {
        let model = LogisticRegression {
            classes: vec![0, 1, 2],
            coefficients: vec![vec![0.0], vec![1.0], vec![2.0]],
            intercepts: vec![0.0, 0.0, 0.0],
        };
        assert!(model.validate().is_ok());
        let proba = model.predict_proba(&[1.0]).unwrap();
        let denom = 1.0 + 1f64.exp() + 2f64.exp();
        assert!((proba[0] - 1.0 / denom).abs() < 1e-12);
        assert!((proba[2] - 2f64.exp() / denom).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0]).unwrap(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut model = binary();
        model.coefficients.push(vec![0.0, 0.0]);
        assert!(model.validate().is_err());

        let ragged = LogisticRegression {
            classes: vec![0, 1, 2],
            coefficients: vec![vec![0.0], vec![1.0, 2.0], vec![2.0]],
            intercepts: vec![0.0; 3],
        };
        assert!(ragged.validate().unwrap_err().contains("ragged"));

        let single = LogisticRegression {
            classes: vec![1],
            coefficients: vec![vec![1.0]],
            intercepts: vec![0.0],
        };
        assert!(single.validate().is_err());
    }

    #[test]
    fn test_wrong_width_input() {
        assert!(matches!(
            binary().predict_proba(&[1.0]),
            Err(PredictionError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
