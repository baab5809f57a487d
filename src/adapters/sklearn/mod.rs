//! Evaluators for parameters exported from the scikit-learn training pipeline.
//!
//! - `scaler`: `StandardScaler` (`scaler.json`)
//! - `linear`: `LogisticRegression`
//! - `forest`: `RandomForest`

mod forest;
mod linear;
mod scaler;

use serde::{Deserialize, Serialize};

use crate::ports::Classifier;

pub use forest::{DecisionTree, RandomForest, TreeNode};
pub use linear::LogisticRegression;
pub use scaler::StandardScaler;

/// Contents of `model.json`, tagged by `"kind"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportedModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ExportedModel {
    /// Validate and box as a classifier.
    ///
    /// # Errors
    /// Returns a description of the first structural problem.
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, String> {
        match self {
            Self::LogisticRegression(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
            Self::RandomForest(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag() {
        let json = r#"{"kind": "logistic_regression", "classes": [0, 1],
                       "coefficients": [[0.5]], "intercepts": [0.0]}"#;
        let model: ExportedModel = serde_json::from_str(json).expect("parses");
        let clf = model.into_classifier().expect("valid");
        assert_eq!(clf.name(), "LogisticRegression");
        assert_eq!(clf.n_features(), 1);

        let unknown = r#"{"kind": "svm", "classes": [0, 1]}"#;
        assert!(serde_json::from_str::<ExportedModel>(unknown).is_err());
    }
}
