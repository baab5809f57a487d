//! Raw student indicators supplied by the presentation layer.
//!
//! PEDE indicators (IDA, IEG, IAA, IPS, IPV, IAN, IPP, INDE) are scores on a
//! nominal 0-10 scale. Contextual fields (age, enrollment year, gender,
//! institution) travel in the same vector; categorical ones as strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// PEDE indicator codes, in the order the dashboard presents them.
pub const PEDE_INDICATORS: [&str; 8] = ["IDA", "IEG", "IAA", "IPS", "IPV", "IAN", "IPP", "INDE"];

/// Nominal range of every PEDE indicator.
pub const PEDE_RANGE: (f64, f64) = (0.0, 10.0);

/// Nominal ranges for the known contextual numeric fields.
const CONTEXT_RANGES: [(&str, f64, f64); 2] = [("IDADE", 6.0, 25.0), ("ANO_INGRESSO", 2015.0, 2025.0)];

/// A single raw input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Numeric(f64),
    Category(String),
}

impl IndicatorValue {
    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Category(_) => None,
        }
    }

    #[must_use]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Category(s) => Some(s.as_str()),
        }
    }
}

impl From<f64> for IndicatorValue {
    fn from(v: f64) -> Self {
        Self::Numeric(v)
    }
}

impl From<&str> for IndicatorValue {
    fn from(s: &str) -> Self {
        Self::Category(s.to_string())
    }
}

impl From<String> for IndicatorValue {
    fn from(s: String) -> Self {
        Self::Category(s)
    }
}

/// Named raw inputs for one student.
///
/// Lookup is by exact name. Order of insertion carries no meaning: the model
/// bundle decides the feature order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorVector {
    values: BTreeMap<String, IndicatorValue>,
}

impl IndicatorVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<IndicatorValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<IndicatorValue>) {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IndicatorValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(IndicatorValue::as_numeric)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndicatorValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check numeric values against their nominal ranges.
    ///
    /// Advisory only: prediction does not reject out-of-range values, the form
    /// uses this to warn before submission.
    ///
    /// # Errors
    /// Returns one message per offending field.
    pub fn validate_ranges(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in &self.values {
            let Some(v) = value.as_numeric() else {
                continue;
            };
            if !v.is_finite() {
                errors.push(format!("{name} must be a finite number"));
                continue;
            }
            if let Some((min, max)) = nominal_range(name) {
                if !(min..=max).contains(&v) {
                    errors.push(format!("{name} {v} out of range [{min}, {max}]"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<K, V> FromIterator<(K, V)> for IndicatorVector
where
    K: Into<String>,
    V: Into<IndicatorValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vector = Self::new();
        for (k, v) in iter {
            vector.insert(k, v);
        }
        vector
    }
}

/// Nominal range for a known numeric field, if any.
#[must_use]
pub fn nominal_range(name: &str) -> Option<(f64, f64)> {
    if PEDE_INDICATORS.contains(&name) {
        return Some(PEDE_RANGE);
    }
    CONTEXT_RANGES
        .iter()
        .find(|(field, _, _)| *field == name)
        .map(|(_, min, max)| (*min, *max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_ignores_insertion_order() {
        let a = IndicatorVector::new().with("IDA", 7.0).with("IEG", 6.5);
        let b = IndicatorVector::new().with("IEG", 6.5).with("IDA", 7.0);
        assert_eq!(a, b);
        assert_eq!(a.numeric("IDA"), Some(7.0));
        assert_eq!(a.numeric("IAN"), None);
    }

    #[test]
    fn test_category_is_not_numeric() {
        let v = IndicatorVector::new().with("GENERO", "Feminino");
        assert_eq!(v.numeric("GENERO"), None);
        assert_eq!(v.get("GENERO").and_then(IndicatorValue::as_category), Some("Feminino"));
    }

    #[test]
    fn test_validate_ranges() {
        let ok = IndicatorVector::new()
            .with("IDA", 0.0)
            .with("INDE", 10.0)
            .with("IDADE", 12.0)
            .with("OUTRO_CAMPO", 999.0);
        assert!(ok.validate_ranges().is_ok());

        let bad = IndicatorVector::new()
            .with("IDA", 10.5)
            .with("ANO_INGRESSO", 2010.0)
            .with("IEG", f64::NAN);
        let errors = bad.validate_ranges().expect_err("should flag three fields");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_from_iterator() {
        let v: IndicatorVector = [("IDA", 5.0), ("IEG", 6.0)].into_iter().collect();
        assert_eq!(v.len(), 2);
    }
}
