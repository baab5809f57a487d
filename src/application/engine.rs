//! Risk engine: Indicator vector in, prediction and risk tier out.
//!
//! The pipeline for one request:
//! - Assemble the feature vector through the bundle's schema
//! - Scale and classify
//! - Validate the probability vector
//! - Map the risk-class probability onto the tier table

use std::sync::Arc;

use super::registry::ModelRegistry;
use crate::domain::{
    validate_distribution, Assessment, IndicatorVector, Prediction, PredictionError, RiskTier,
    TierTable,
};
use crate::ports::{argmax, ModelBundle, ModelLoadError, ModelStore};
use crate::PedeError;

/// Run one prediction against a loaded bundle.
///
/// Pure: the same bundle and indicators always give the same result, and no
/// model arithmetic happens until every feature has been resolved.
///
/// # Errors
/// Returns `PredictionError` for missing or mistyped inputs, dimension drift
/// or an invalid probability vector.
pub fn predict(
    bundle: &ModelBundle,
    indicators: &IndicatorVector,
) -> Result<Prediction, PredictionError> {
    let features = bundle.schema().assemble(indicators)?;

    let scaler = bundle.scaler();
    if features.len() != scaler.dim() {
        return Err(PredictionError::DimensionMismatch {
            expected: scaler.dim(),
            actual: features.len(),
        });
    }
    let scaled = scaler.transform(&features)?;

    let classifier = bundle.classifier();
    let classes = classifier.classes();
    let probabilities = classifier.predict_proba(&scaled)?;
    validate_distribution(&probabilities, classes.len())?;

    let best = argmax(&probabilities).ok_or_else(|| {
        PredictionError::InvalidProbabilities("empty distribution".to_string())
    })?;
    let risk_probability = probabilities[bundle.risk_class_index()];

    Ok(Prediction {
        predicted_class: classes[best],
        classes: classes.to_vec(),
        probabilities,
        risk_probability,
        at_risk: bundle.threshold().map(|t| risk_probability >= t),
    })
}

/// Map a risk probability onto a tier table.
///
/// # Errors
/// Returns `PredictionError::InvalidProbability` for NaN or values outside [0, 1].
pub fn classify_tier(probability: f64, table: &TierTable) -> Result<&RiskTier, PredictionError> {
    table.classify(probability)
}

#[derive(Debug, Clone)]
enum EngineState {
    Ready(Arc<ModelBundle>),
    Unavailable(ModelLoadError),
}

/// Prediction entry point held by the UI.
///
/// Either ready with a shared bundle or permanently unavailable with the
/// load error that caused it.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    state: EngineState,
}

impl RiskEngine {
    /// Load the bundle through the registry. A failure is kept as state.
    pub fn load(registry: &ModelRegistry, store: &dyn ModelStore) -> Self {
        match registry.load(store) {
            Ok(bundle) => Self::from_bundle(bundle),
            Err(e) => {
                tracing::warn!("Predictions unavailable: {}", e);
                Self {
                    state: EngineState::Unavailable(e),
                }
            }
        }
    }

    #[must_use]
    pub fn from_bundle(bundle: Arc<ModelBundle>) -> Self {
        Self {
            state: EngineState::Ready(bundle),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// The shared bundle, if loaded.
    #[must_use]
    pub fn bundle(&self) -> Option<&Arc<ModelBundle>> {
        match &self.state {
            EngineState::Ready(bundle) => Some(bundle),
            EngineState::Unavailable(_) => None,
        }
    }

    /// Why predictions are unavailable.
    #[must_use]
    pub fn load_error(&self) -> Option<&ModelLoadError> {
        match &self.state {
            EngineState::Ready(_) => None,
            EngineState::Unavailable(e) => Some(e),
        }
    }

    fn require_bundle(&self) -> crate::Result<&ModelBundle> {
        match &self.state {
            EngineState::Ready(bundle) => Ok(bundle.as_ref()),
            EngineState::Unavailable(e) => Err(PedeError::PredictionsUnavailable(e.to_string())),
        }
    }

    /// # Errors
    /// Returns `PedeError::PredictionsUnavailable` if the bundle failed to
    /// load, or `PedeError::Prediction` for a rejected request.
    pub fn predict(&self, indicators: &IndicatorVector) -> crate::Result<Prediction> {
        let bundle = self.require_bundle()?;
        Ok(predict(bundle, indicators)?)
    }

    /// Predict, classify and wrap the result with its tier guidance.
    ///
    /// # Errors
    /// Same as [`RiskEngine::predict`], plus `PedeError::Prediction` if the
    /// risk probability cannot be placed in a tier.
    pub fn assess(&self, indicators: &IndicatorVector) -> crate::Result<Assessment> {
        let prediction = self.predict(indicators)?;
        let bundle = self.require_bundle()?;
        let tier = classify_tier(prediction.risk_probability, bundle.tiers())?.clone();
        let class_label = bundle
            .metadata()
            .class_label(prediction.predicted_class)
            .map(str::to_string);

        tracing::info!(
            "Assessment complete: tier={}, risk_probability={:.4}",
            tier.name,
            prediction.risk_probability
        );

        Ok(Assessment::new(prediction, tier, class_label))
    }
}
