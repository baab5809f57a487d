//! Descriptive metadata shipped with a trained model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Training report exported alongside the model (`metadata.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub model_name: Option<String>,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub auc: Option<f64>,
    pub cv_mean: Option<f64>,
    pub cv_std: Option<f64>,
    pub feature_importance: BTreeMap<String, f64>,
    /// Label of the "at risk" class. Defaults to the last class label.
    pub risk_class: Option<i64>,
    /// Display names per class label (JSON object keys are the labels).
    pub class_labels: BTreeMap<String, String>,
}

impl ModelMetadata {
    /// Features by descending importance; ties keep name order.
    #[must_use]
    pub fn importance_ranking(&self) -> Vec<(&str, f64)> {
        let mut ranking: Vec<(&str, f64)> = self
            .feature_importance
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    #[must_use]
    pub fn class_label(&self, class: i64) -> Option<&str> {
        self.class_labels.get(&class.to_string()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_ranking_descending() {
        let meta: ModelMetadata = serde_json::from_str(
            r#"{"feature_importance": {"IDA": 0.05, "IAN": 0.34, "IPV": 0.10}}"#,
        )
        .expect("parses");
        let ranking = meta.importance_ranking();
        assert_eq!(ranking[0].0, "IAN");
        assert_eq!(ranking[2].0, "IDA");
        assert!(meta.model_name.is_none());
    }

    #[test]
    fn test_class_labels() {
        let meta: ModelMetadata =
            serde_json::from_str(r#"{"class_labels": {"1": "Em risco"}}"#).expect("parses");
        assert_eq!(meta.class_label(1), Some("Em risco"));
        assert_eq!(meta.class_label(0), None);
    }
}
