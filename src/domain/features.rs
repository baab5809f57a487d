//! Feature schema: how each model feature is resolved from raw indicators.
//!
//! Every feature name declared by a model bundle maps to exactly one rule,
//! fixed at load time:
//! - `Raw`: the numeric indicator of the same name, passed through
//! - `Categorical`: the integer code of a categorical value under a fitted encoder
//! - `Derived`: a statistic computed from raw numeric indicators
//!
//! Assembly reorders by name; the caller's insertion order is irrelevant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::indicators::{IndicatorValue, IndicatorVector};
use super::prediction::PredictionError;

/// Indicators averaged by derivation set version 1.
pub const V1_BASE_INDICATORS: [&str; 6] = ["IDA", "IEG", "IAA", "IPS", "IPV", "IAN"];

/// Offset added to the IDA denominator in `RATIO_IEG_IDA` (version 1).
pub const V1_RATIO_OFFSET: f64 = 0.1;

/// Schema resolution failures. Surface as model load errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Feature list is empty")]
    NoFeatures,

    #[error("Duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("Encoder declared for unknown feature: {0}")]
    UnknownEncoder(String),

    #[error("Derivation declared for unknown feature: {0}")]
    UnknownDerivation(String),

    #[error("Feature {0} has both an encoder and a derivation")]
    ConflictingRules(String),

    #[error("Encoder for {0} has an empty vocabulary")]
    EmptyVocabulary(String),

    #[error("Derivation for {0} has no inputs")]
    EmptyDerivation(String),

    #[error("Derivation for {feature} reads {input}, which is not a raw numeric indicator")]
    InvalidDerivationInput { feature: String, input: String },
}

/// A fixed derivation formula over raw numeric indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Derivation {
    /// Arithmetic mean.
    Mean { inputs: Vec<String> },
    /// Population standard deviation (ddof = 0).
    Std { inputs: Vec<String> },
    /// `minuend - subtrahend`.
    Gap { minuend: String, subtrahend: String },
    /// `numerator / (denominator + offset)`.
    Ratio {
        numerator: String,
        denominator: String,
        #[serde(default)]
        offset: f64,
    },
}

impl Derivation {
    /// Raw indicator names this formula reads.
    #[must_use]
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Self::Mean { inputs } | Self::Std { inputs } => {
                inputs.iter().map(String::as_str).collect()
            }
            Self::Gap {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
            Self::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }

    /// Evaluate against already-resolved numeric inputs.
    fn evaluate<F>(&self, value_of: F) -> Result<f64, PredictionError>
    where
        F: Fn(&str) -> Result<f64, PredictionError>,
    {
        match self {
            Self::Mean { inputs } => {
                let values = inputs
                    .iter()
                    .map(|n| value_of(n.as_str()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(mean(&values))
            }
            Self::Std { inputs } => {
                let values = inputs
                    .iter()
                    .map(|n| value_of(n.as_str()))
                    .collect::<Result<Vec<_>, _>>()?;
                let m = mean(&values);
                let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
                Ok(var.sqrt())
            }
            Self::Gap {
                minuend,
                subtrahend,
            } => Ok(value_of(minuend.as_str())? - value_of(subtrahend.as_str())?),
            Self::Ratio {
                numerator,
                denominator,
                offset,
            } => Ok(value_of(numerator.as_str())? / (value_of(denominator.as_str())? + offset)),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// A versioned set of named derivations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationSet {
    pub version: u32,
    pub features: BTreeMap<String, Derivation>,
    /// Declared by the bundle (strict) rather than built in (applied on match).
    #[serde(skip, default = "declared_default")]
    pub declared: bool,
}

fn declared_default() -> bool {
    true
}

impl DerivationSet {
    /// Derivations the original risk model was trained with.
    #[must_use]
    pub fn v1() -> Self {
        let base: Vec<String> = V1_BASE_INDICATORS.iter().map(|s| (*s).to_string()).collect();
        let mut features = BTreeMap::new();
        features.insert(
            "MEDIA_INDICADORES".to_string(),
            Derivation::Mean {
                inputs: base.clone(),
            },
        );
        features.insert(
            "STD_INDICADORES".to_string(),
            Derivation::Std { inputs: base },
        );
        features.insert(
            "GAP_IDA_IAA".to_string(),
            Derivation::Gap {
                minuend: "IDA".to_string(),
                subtrahend: "IAA".to_string(),
            },
        );
        features.insert(
            "RATIO_IEG_IDA".to_string(),
            Derivation::Ratio {
                numerator: "IEG".to_string(),
                denominator: "IDA".to_string(),
                offset: V1_RATIO_OFFSET,
            },
        );
        Self {
            version: 1,
            features,
            declared: false,
        }
    }
}

/// Closed vocabulary fitted for one categorical feature.
///
/// Codes follow label-encoder semantics: the index of the value in the sorted
/// vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    #[must_use]
    pub fn new(mut classes: Vec<String>) -> Self {
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn code(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }
}

/// Resolution rule for one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureRule {
    Raw,
    Categorical(CategoryEncoder),
    Derived(Derivation),
}

/// Kind of raw input a caller must supply.
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind<'a> {
    Numeric,
    Categorical(&'a [String]),
}

/// A raw input required to assemble the feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredInput<'a> {
    pub name: &'a str,
    pub kind: InputKind<'a>,
}

/// Ordered feature names with their resolution rules.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    features: Vec<(String, FeatureRule)>,
}

impl FeatureSchema {
    /// Resolve each feature name to a rule.
    ///
    /// A feature with a derivation is derived, one with an encoder is
    /// categorical, anything else passes through raw. A name claimed by both
    /// an encoder and a derivation (built-in ones included) is rejected.
    ///
    /// # Errors
    /// Returns `SchemaError` for duplicate names, conflicting rules,
    /// declarations that do not match the feature list, or derivations
    /// reading non-raw inputs.
    pub fn resolve(
        names: &[String],
        encoders: &BTreeMap<String, CategoryEncoder>,
        derivations: &DerivationSet,
    ) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::NoFeatures);
        }

        let mut sorted: Vec<&String> = names.iter().collect();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(SchemaError::DuplicateFeature(pair[0].clone()));
        }

        let known = |n: &str| names.iter().any(|f| f == n);

        for (name, encoder) in encoders {
            if !known(name) {
                return Err(SchemaError::UnknownEncoder(name.clone()));
            }
            if encoder.classes().is_empty() {
                return Err(SchemaError::EmptyVocabulary(name.clone()));
            }
            if derivations.features.contains_key(name) {
                return Err(SchemaError::ConflictingRules(name.clone()));
            }
        }

        if derivations.declared {
            if let Some(name) = derivations.features.keys().find(|n| !known(n)) {
                return Err(SchemaError::UnknownDerivation(name.clone()));
            }
        }

        let mut features = Vec::with_capacity(names.len());
        for name in names {
            let rule = if let Some(derivation) = derivations.features.get(name) {
                FeatureRule::Derived(derivation.clone())
            } else if let Some(encoder) = encoders.get(name) {
                FeatureRule::Categorical(encoder.clone())
            } else {
                FeatureRule::Raw
            };
            features.push((name.clone(), rule));
        }

        let schema = Self { features };
        schema.check_derivation_inputs()?;
        Ok(schema)
    }

    fn check_derivation_inputs(&self) -> Result<(), SchemaError> {
        for (name, rule) in &self.features {
            let FeatureRule::Derived(derivation) = rule else {
                continue;
            };
            let inputs = derivation.inputs();
            if inputs.is_empty() {
                return Err(SchemaError::EmptyDerivation(name.clone()));
            }
            for input in inputs {
                let non_raw = self
                    .rule(input)
                    .is_some_and(|r| !matches!(r, FeatureRule::Raw));
                if non_raw {
                    return Err(SchemaError::InvalidDerivationInput {
                        feature: name.clone(),
                        input: input.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&FeatureRule> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Raw inputs a caller must supply, in first-use order.
    #[must_use]
    pub fn required_inputs(&self) -> Vec<RequiredInput<'_>> {
        let mut out = Vec::new();

        for (name, rule) in &self.features {
            match rule {
                FeatureRule::Raw => push_unique(&mut out, name.as_str(), InputKind::Numeric),
                FeatureRule::Categorical(encoder) => push_unique(
                    &mut out,
                    name.as_str(),
                    InputKind::Categorical(encoder.classes()),
                ),
                FeatureRule::Derived(derivation) => {
                    for input in derivation.inputs() {
                        push_unique(&mut out, input, InputKind::Numeric);
                    }
                }
            }
        }
        out
    }

    /// Build the feature vector for one request.
    ///
    /// Every feature is resolved before anything is returned; no partial
    /// vector escapes on error.
    ///
    /// # Errors
    /// Returns the first `PredictionError` met in feature order.
    pub fn assemble(&self, indicators: &IndicatorVector) -> Result<Vec<f64>, PredictionError> {
        let mut vector = Vec::with_capacity(self.features.len());

        for (name, rule) in &self.features {
            let value = match rule {
                FeatureRule::Raw => numeric_input(indicators, name)?,
                FeatureRule::Categorical(encoder) => {
                    let raw = match indicators.get(name) {
                        None => return Err(PredictionError::MissingFeature(name.clone())),
                        Some(IndicatorValue::Numeric(_)) => {
                            return Err(PredictionError::ExpectedCategory(name.clone()))
                        }
                        Some(IndicatorValue::Category(s)) => s,
                    };
                    let code = encoder.code(raw).ok_or_else(|| PredictionError::UnknownCategory {
                        feature: name.clone(),
                        value: raw.clone(),
                    })?;
                    code as f64
                }
                FeatureRule::Derived(derivation) => {
                    let v = derivation.evaluate(|input| numeric_input(indicators, input))?;
                    if !v.is_finite() {
                        return Err(PredictionError::NonFinite(name.clone()));
                    }
                    v
                }
            };
            vector.push(value);
        }

        Ok(vector)
    }
}

fn push_unique<'a>(out: &mut Vec<RequiredInput<'a>>, name: &'a str, kind: InputKind<'a>) {
    if !out.iter().any(|r| r.name == name) {
        out.push(RequiredInput { name, kind });
    }
}

fn numeric_input(indicators: &IndicatorVector, name: &str) -> Result<f64, PredictionError> {
    match indicators.get(name) {
        None => Err(PredictionError::MissingFeature(name.to_string())),
        Some(IndicatorValue::Category(_)) => Err(PredictionError::ExpectedNumeric(name.to_string())),
        Some(IndicatorValue::Numeric(v)) if !v.is_finite() => {
            Err(PredictionError::NonFinite(name.to_string()))
        }
        Some(IndicatorValue::Numeric(v)) => Ok(*v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn v1_names() -> Vec<String> {
        names(&[
            "IDA",
            "IEG",
            "IAA",
            "IPS",
            "IPV",
            "IAN",
            "MEDIA_INDICADORES",
            "STD_INDICADORES",
            "GAP_IDA_IAA",
            "RATIO_IEG_IDA",
        ])
    }

    fn sample() -> IndicatorVector {
        IndicatorVector::new()
            .with("IDA", 6.0)
            .with("IEG", 8.0)
            .with("IAA", 9.0)
            .with("IPS", 7.0)
            .with("IPV", 5.0)
            .with("IAN", 7.0)
    }

    #[test]
    fn test_v1_derivations_match_training_formulas() {
        let schema = FeatureSchema::resolve(&v1_names(), &BTreeMap::new(), &DerivationSet::v1())
            .expect("schema resolves");
        let v = schema.assemble(&sample()).expect("assembles");

        assert_eq!(v.len(), 10);
        assert_eq!(&v[..6], &[6.0, 8.0, 9.0, 7.0, 5.0, 7.0]);
        // mean = 42 / 6
        assert!((v[6] - 7.0).abs() < 1e-12);
        // population std: squared deviations 1+1+4+0+4+0 = 10, /6
        assert!((v[7] - (10.0_f64 / 6.0).sqrt()).abs() < 1e-12);
        assert!((v[8] - (-3.0)).abs() < 1e-12);
        assert!((v[9] - 8.0 / 6.1).abs() < 1e-12);
    }

    #[test]
    fn test_reorders_by_name() {
        let schema = FeatureSchema::resolve(
            &names(&["IAN", "IDA"]),
            &BTreeMap::new(),
            &DerivationSet::v1(),
        )
        .expect("schema resolves");
        let v = schema
            .assemble(&IndicatorVector::new().with("IDA", 1.0).with("IAN", 2.0).with("EXTRA", 3.0))
            .expect("assembles");
        assert_eq!(v, vec![2.0, 1.0]);
    }

    #[test]
    fn test_missing_feature_including_derivation_input() {
        let schema =
            FeatureSchema::resolve(&names(&["GAP_IDA_IAA"]), &BTreeMap::new(), &DerivationSet::v1())
                .expect("schema resolves");
        let err = schema
            .assemble(&IndicatorVector::new().with("IDA", 5.0))
            .expect_err("IAA missing");
        assert_eq!(err, PredictionError::MissingFeature("IAA".to_string()));
    }

    #[test]
    fn test_categorical_encoding() {
        let mut encoders = BTreeMap::new();
        encoders.insert(
            "GENERO".to_string(),
            CategoryEncoder::new(names(&["Masculino", "Feminino"])),
        );
        let schema = FeatureSchema::resolve(&names(&["IDA", "GENERO"]), &encoders, &DerivationSet::v1())
            .expect("schema resolves");

        let v = schema
            .assemble(&IndicatorVector::new().with("IDA", 5.0).with("GENERO", "Masculino"))
            .expect("assembles");
        assert_eq!(v, vec![5.0, 1.0]);

        let err = schema
            .assemble(&IndicatorVector::new().with("IDA", 5.0).with("GENERO", "Outro"))
            .expect_err("unknown category");
        assert!(matches!(err, PredictionError::UnknownCategory { .. }));

        let err = schema
            .assemble(&IndicatorVector::new().with("IDA", 5.0).with("GENERO", 1.0))
            .expect_err("numeric for categorical");
        assert_eq!(err, PredictionError::ExpectedCategory("GENERO".to_string()));
    }

    #[test]
    fn test_type_and_finiteness_checks() {
        let schema = FeatureSchema::resolve(&names(&["IDA"]), &BTreeMap::new(), &DerivationSet::v1())
            .expect("schema resolves");
        assert_eq!(
            schema.assemble(&IndicatorVector::new().with("IDA", "alto")),
            Err(PredictionError::ExpectedNumeric("IDA".to_string()))
        );
        assert_eq!(
            schema.assemble(&IndicatorVector::new().with("IDA", f64::INFINITY)),
            Err(PredictionError::NonFinite("IDA".to_string()))
        );
    }

    #[test]
    fn test_derived_division_by_zero_is_non_finite() {
        let mut set = DerivationSet::v1();
        set.features.insert(
            "R".to_string(),
            Derivation::Ratio {
                numerator: "IEG".to_string(),
                denominator: "IDA".to_string(),
                offset: 0.0,
            },
        );
        let schema = FeatureSchema::resolve(&names(&["R"]), &BTreeMap::new(), &set)
            .expect("schema resolves");
        let err = schema
            .assemble(&IndicatorVector::new().with("IEG", 1.0).with("IDA", 0.0))
            .expect_err("inf");
        assert_eq!(err, PredictionError::NonFinite("R".to_string()));
    }

    #[test]
    fn test_schema_errors() {
        assert_eq!(
            FeatureSchema::resolve(&[], &BTreeMap::new(), &DerivationSet::v1()),
            Err(SchemaError::NoFeatures)
        );
        assert!(matches!(
            FeatureSchema::resolve(&names(&["IDA", "IDA"]), &BTreeMap::new(), &DerivationSet::v1()),
            Err(SchemaError::DuplicateFeature(_))
        ));

        let mut encoders = BTreeMap::new();
        encoders.insert("ESCOLA".to_string(), CategoryEncoder::new(names(&["A"])));
        assert!(matches!(
            FeatureSchema::resolve(&names(&["IDA"]), &encoders, &DerivationSet::v1()),
            Err(SchemaError::UnknownEncoder(_))
        ));

        let mut declared = DerivationSet::v1();
        declared.declared = true;
        assert!(matches!(
            FeatureSchema::resolve(&names(&["MEDIA_INDICADORES"]), &BTreeMap::new(), &declared),
            Err(SchemaError::UnknownDerivation(_))
        ));

        // A derivation may not read a categorical feature.
        let mut encoders = BTreeMap::new();
        encoders.insert("IDA".to_string(), CategoryEncoder::new(names(&["x"])));
        assert!(matches!(
            FeatureSchema::resolve(&names(&["IDA", "GAP_IDA_IAA"]), &encoders, &DerivationSet::v1()),
            Err(SchemaError::InvalidDerivationInput { .. })
        ));
    }

    #[test]
    fn test_encoder_on_derived_feature_is_rejected() {
        let mut encoders = BTreeMap::new();
        encoders.insert(
            "GAP_IDA_IAA".to_string(),
            CategoryEncoder::new(names(&["a", "b"])),
        );
        assert_eq!(
            FeatureSchema::resolve(&names(&["IDA", "GAP_IDA_IAA"]), &encoders, &DerivationSet::v1()),
            Err(SchemaError::ConflictingRules("GAP_IDA_IAA".to_string()))
        );

        let mut declared = DerivationSet::v1();
        declared.declared = true;
        declared.features.retain(|name, _| name == "GAP_IDA_IAA");
        assert_eq!(
            FeatureSchema::resolve(&names(&["IDA", "IAA", "GAP_IDA_IAA"]), &encoders, &declared),
            Err(SchemaError::ConflictingRules("GAP_IDA_IAA".to_string()))
        );
    }

    #[test]
    fn test_required_inputs() {
        let mut encoders = BTreeMap::new();
        encoders.insert(
            "GENERO".to_string(),
            CategoryEncoder::new(names(&["Feminino", "Masculino"])),
        );
        let schema = FeatureSchema::resolve(
            &names(&["IDA", "GAP_IDA_IAA", "GENERO"]),
            &encoders,
            &DerivationSet::v1(),
        )
        .expect("schema resolves");

        let required = schema.required_inputs();
        let list: Vec<&str> = required.iter().map(|r| r.name).collect();
        assert_eq!(list, vec!["IDA", "IAA", "GENERO"]);
        assert!(matches!(required[2].kind, InputKind::Categorical(v) if v.len() == 2));
    }

    #[test]
    fn test_derivation_json_shape() {
        let json = r#"{"version": 2, "features": {
            "M": {"op": "mean", "inputs": ["IDA", "IEG"]},
            "R": {"op": "ratio", "numerator": "IEG", "denominator": "IDA", "offset": 0.1}
        }}"#;
        let set: DerivationSet = serde_json::from_str(json).expect("parses");
        assert_eq!(set.version, 2);
        assert!(set.declared);
        assert!(matches!(set.features.get("R"), Some(Derivation::Ratio { offset, .. }) if (*offset - 0.1).abs() < 1e-12));
    }
}
