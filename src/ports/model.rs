//! Model ports: Traits for the pre-fitted scaler and classifier, and for the
//! store that loads them.
//!
//! The engine only relies on the capability set `{transform, predict,
//! predict_proba}`; any serialization format or algorithm can sit behind it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::domain::{
    CategoryEncoder, ConfigError, DerivationSet, FeatureSchema, ModelMetadata, PredictionError,
    SchemaError, TierTable,
};

/// Failure to obtain a usable model bundle.
///
/// Fatal to prediction only; the process keeps running with predictions
/// unavailable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {0}")]
    MissingArtifact(String),

    #[error("Failed to read {artifact}: {reason}")]
    Unreadable { artifact: String, reason: String },

    #[error("Malformed {artifact}: {reason}")]
    Malformed { artifact: String, reason: String },

    #[error("Inconsistent model bundle: {0}")]
    Inconsistent(String),

    #[error("Artifact {0} does not match its manifest digest")]
    IntegrityMismatch(String),

    #[error("Invalid feature schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid tier table: {0}")]
    Tiers(#[from] ConfigError),
}

/// Fitted affine feature transform.
pub trait Scaler: Send + Sync + fmt::Debug {
    /// Number of features the scaler was fitted on.
    fn dim(&self) -> usize;

    /// Map a feature vector to its normalized form.
    ///
    /// # Errors
    /// Returns `PredictionError::DimensionMismatch` if `x.len() != self.dim()`.
    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError>;
}

/// Fitted classifier over normalized feature vectors.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Number of input features.
    fn n_features(&self) -> usize;

    /// Class labels, in the order of `predict_proba` output.
    fn classes(&self) -> &[i64];

    /// Probability distribution over `classes()`.
    ///
    /// # Errors
    /// Returns `PredictionError::DimensionMismatch` on a wrong-sized input.
    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError>;

    /// Most probable class label (first on ties).
    ///
    /// # Errors
    /// Propagates `predict_proba` errors.
    fn predict(&self, x: &[f64]) -> Result<i64, PredictionError> {
        let proba = self.predict_proba(x)?;
        let best = argmax(&proba).ok_or_else(|| {
            PredictionError::InvalidProbabilities("empty distribution".to_string())
        })?;
        self.classes().get(best).copied().ok_or_else(|| {
            PredictionError::InvalidProbabilities(format!(
                "{} probabilities for {} classes",
                proba.len(),
                self.classes().len()
            ))
        })
    }

    /// Human-readable algorithm name.
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Index of the largest value; first index wins ties.
#[must_use]
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if *v <= b => {}
            _ => best = Some((i, *v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Source of model artifacts.
pub trait ModelStore: Send + Sync {
    /// Where the artifacts live. Used as the load-once cache key.
    fn location(&self) -> PathBuf;

    /// Load and validate a complete bundle.
    ///
    /// # Errors
    /// Returns `ModelLoadError` when an artifact is missing, unreadable or
    /// inconsistent with the others.
    fn load(&self) -> Result<ModelBundle, ModelLoadError>;
}

/// Components a store hands over to build a bundle.
#[derive(Debug)]
pub struct BundleParts {
    pub feature_names: Vec<String>,
    pub scaler: Box<dyn Scaler>,
    pub classifier: Box<dyn Classifier>,
    pub encoders: BTreeMap<String, CategoryEncoder>,
    pub derivations: Option<DerivationSet>,
    pub metadata: ModelMetadata,
    pub tiers: Option<TierTable>,
    pub threshold: Option<f64>,
}

impl BundleParts {
    /// Minimal parts: no encoders, built-in derivations, default tiers.
    #[must_use]
    pub fn new(
        feature_names: Vec<String>,
        scaler: Box<dyn Scaler>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        Self {
            feature_names,
            scaler,
            classifier,
            encoders: BTreeMap::new(),
            derivations: None,
            metadata: ModelMetadata::default(),
            tiers: None,
            threshold: None,
        }
    }
}

/// The load-once aggregate: schema, scaler, classifier, metadata and tiers.
///
/// Immutable after construction and shared read-only between requests.
#[derive(Debug)]
pub struct ModelBundle {
    schema: FeatureSchema,
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
    metadata: ModelMetadata,
    tiers: TierTable,
    threshold: Option<f64>,
    risk_class_index: usize,
}

impl ModelBundle {
    /// Cross-check the parts and assemble a bundle.
    ///
    /// Tier table precedence: explicit table, then a binary table split at
    /// the decision threshold, then the default four-tier table.
    ///
    /// # Errors
    /// Returns `ModelLoadError` if the parts disagree on dimensionality or
    /// class labels, or the schema/tier table is invalid.
    pub fn from_parts(parts: BundleParts) -> Result<Self, ModelLoadError> {
        let derivations = parts.derivations.unwrap_or_else(DerivationSet::v1);
        let schema = FeatureSchema::resolve(&parts.feature_names, &parts.encoders, &derivations)?;

        let n = schema.len();
        if parts.scaler.dim() != n {
            return Err(ModelLoadError::Inconsistent(format!(
                "scaler fitted on {} features, feature list has {n}",
                parts.scaler.dim()
            )));
        }
        if parts.classifier.n_features() != n {
            return Err(ModelLoadError::Inconsistent(format!(
                "classifier expects {} features, feature list has {n}",
                parts.classifier.n_features()
            )));
        }

        let classes = parts.classifier.classes();
        if classes.len() < 2 {
            return Err(ModelLoadError::Inconsistent(format!(
                "classifier declares {} classes, need at least 2",
                classes.len()
            )));
        }
        if let Some((i, c)) = classes
            .iter()
            .enumerate()
            .find(|(i, c)| classes[..*i].contains(c))
        {
            return Err(ModelLoadError::Inconsistent(format!(
                "class label {c} repeated at index {i}"
            )));
        }
        let risk_class = match parts.metadata.risk_class {
            Some(c) => c,
            None => classes[classes.len() - 1],
        };
        let risk_class_index = classes.iter().position(|c| *c == risk_class).ok_or_else(|| {
            ModelLoadError::Inconsistent(format!("risk class {risk_class} is not a classifier class"))
        })?;

        if let Some(t) = parts.threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ModelLoadError::Inconsistent(format!(
                    "decision threshold {t} outside [0, 1]"
                )));
            }
        }

        let tiers = match (parts.tiers, parts.threshold) {
            (Some(table), _) => table,
            (None, Some(t)) => TierTable::binary(t)?,
            (None, None) => TierTable::default_four_tier(),
        };

        Ok(Self {
            schema,
            scaler: parts.scaler,
            classifier: parts.classifier,
            metadata: parts.metadata,
            tiers,
            threshold: parts.threshold,
            risk_class_index,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.schema.names()
    }

    #[must_use]
    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    #[must_use]
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    #[must_use]
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    #[must_use]
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Position of the risk class in the classifier's probability vector.
    #[must_use]
    pub fn risk_class_index(&self) -> usize {
        self.risk_class_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.8]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.1, 0.45, 0.45]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
