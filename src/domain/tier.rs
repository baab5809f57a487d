//! Risk tiers: named probability buckets with intervention guidance.
//!
//! A tier table partitions [0, 1] into half-open intervals `[low, high)`; the
//! top tier is closed at 1.0. Tables are validated once when built, so
//! classification is a total function over [0, 1].

use serde::{Deserialize, Serialize};

use super::prediction::PredictionError;

/// Slack allowed when checking that adjacent bounds meet.
const BOUND_TOLERANCE: f64 = 1e-9;

/// Malformed tier table. Fatal at startup: prediction stays disabled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Tier table is empty")]
    Empty,

    #[error("Tier {name} has invalid bounds [{low}, {high})")]
    InvalidBounds { name: String, low: f64, high: f64 },

    #[error("Tier table must start at 0.0, starts at {0}")]
    DoesNotStartAtZero(f64),

    #[error("Tier table must end at 1.0, ends at {0}")]
    DoesNotEndAtOne(f64),

    #[error("Gap between tiers {lower} and {upper}")]
    Gap { lower: String, upper: String },

    #[error("Tiers {lower} and {upper} overlap")]
    Overlap { lower: String, upper: String },

    #[error("Duplicate tier name: {0}")]
    DuplicateName(String),
}

/// Tier as declared in a bundle's `tiers.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub guidance: Vec<String>,
}

impl TierSpec {
    fn new(name: &str, label: &str, low: f64, high: f64, guidance: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            low,
            high,
            guidance: guidance.iter().map(|g| (*g).to_string()).collect(),
        }
    }
}

/// A validated tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTier {
    pub name: String,
    pub label: String,
    pub low: f64,
    pub high: f64,
    /// 0 for the lowest tier, increasing with risk.
    pub severity: usize,
    pub guidance: Vec<String>,
    /// Whether `high` is inclusive (top tier only).
    pub closed_high: bool,
}

impl RiskTier {
    /// Whether `p` falls inside this tier's interval.
    #[must_use]
    pub fn contains(&self, p: f64) -> bool {
        if self.closed_high {
            p >= self.low && p <= self.high
        } else {
            p >= self.low && p < self.high
        }
    }
}

/// Ordered, validated tier table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierTable {
    tiers: Vec<RiskTier>,
}

impl TierTable {
    /// Validate and build a table. Specs may come in any order.
    ///
    /// # Errors
    /// Returns `ConfigError` when the specs do not partition [0, 1].
    pub fn new(mut specs: Vec<TierSpec>) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::Empty);
        }

        for spec in &specs {
            if !spec.low.is_finite() || !spec.high.is_finite() || spec.low >= spec.high {
                return Err(ConfigError::InvalidBounds {
                    name: spec.name.clone(),
                    low: spec.low,
                    high: spec.high,
                });
            }
        }

        let mut names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::DuplicateName(pair[0].to_string()));
        }

        specs.sort_by(|a, b| a.low.total_cmp(&b.low));

        let first_low = specs[0].low;
        if first_low.abs() > BOUND_TOLERANCE {
            return Err(ConfigError::DoesNotStartAtZero(first_low));
        }
        let last_high = specs[specs.len() - 1].high;
        if (last_high - 1.0).abs() > BOUND_TOLERANCE {
            return Err(ConfigError::DoesNotEndAtOne(last_high));
        }

        for pair in specs.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.low > lower.high + BOUND_TOLERANCE {
                return Err(ConfigError::Gap {
                    lower: lower.name.clone(),
                    upper: upper.name.clone(),
                });
            }
            if upper.low < lower.high - BOUND_TOLERANCE {
                return Err(ConfigError::Overlap {
                    lower: lower.name.clone(),
                    upper: upper.name.clone(),
                });
            }
        }

        let last = specs.len() - 1;
        let mut tiers: Vec<RiskTier> = Vec::with_capacity(specs.len());
        for (severity, spec) in specs.into_iter().enumerate() {
            // Snap bounds so adjacent tiers share the exact same edge.
            let low = match tiers.last() {
                Some(prev) => prev.high,
                None => 0.0,
            };
            let high = if severity == last { 1.0 } else { spec.high };
            tiers.push(RiskTier {
                label: spec.label.unwrap_or_else(|| spec.name.clone()),
                name: spec.name,
                low,
                high,
                severity,
                guidance: spec.guidance,
                closed_high: severity == last,
            });
        }

        Ok(Self { tiers })
    }

    /// Four-tier scheme used by the continuous-risk model.
    #[must_use]
    pub fn default_four_tier() -> Self {
        let specs = vec![
            TierSpec::new(
                "SemRisco",
                "Sem risco",
                0.0,
                0.3,
                &[
                    "Manter acompanhamento regular",
                    "Incentivar participação em atividades",
                    "Estabelecer metas de desenvolvimento",
                ],
            ),
            TierSpec::new(
                "Atenção",
                "Atenção",
                0.3,
                0.6,
                &[
                    "Monitorar os indicadores a cada ciclo de avaliação",
                    "Conversar com o aluno sobre engajamento e autoavaliação",
                    "Reforço pontual nas disciplinas com menor desempenho",
                ],
            ),
            TierSpec::new(
                "Moderado",
                "Risco moderado",
                0.6,
                0.85,
                &[
                    "Acompanhamento pedagógico semanal",
                    "Suporte psicossocial",
                    "Plano de metas revisado com a família",
                ],
            ),
            TierSpec::new(
                "Alto",
                "Risco alto",
                0.85,
                1.0,
                &[
                    "Acompanhamento pedagógico intensivo",
                    "Suporte psicossocial",
                    "Monitoramento frequente dos indicadores",
                    "Plano de intervenção personalizado",
                ],
            ),
        ];
        // Constant table; validated by tests.
        match Self::new(specs) {
            Ok(table) => table,
            Err(e) => unreachable!("built-in tier table is invalid: {e}"),
        }
    }

    /// Two-tier scheme split at a binary decision threshold.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidBounds` unless `0 < threshold < 1`.
    pub fn binary(threshold: f64) -> Result<Self, ConfigError> {
        Self::new(vec![
            TierSpec::new(
                "BaixoRisco",
                "Baixo risco",
                0.0,
                threshold,
                &[
                    "Manter acompanhamento regular",
                    "Incentivar participação em atividades",
                    "Estabelecer metas de desenvolvimento",
                ],
            ),
            TierSpec::new(
                "EmRisco",
                "Em risco",
                threshold,
                1.0,
                &[
                    "Acompanhamento pedagógico intensivo",
                    "Suporte psicossocial",
                    "Monitoramento frequente dos indicadores",
                    "Plano de intervenção personalizado",
                ],
            ),
        ])
    }

    /// Tier whose interval contains `p`.
    ///
    /// # Errors
    /// Returns `PredictionError::InvalidProbability` for NaN or values outside [0, 1].
    pub fn classify(&self, p: f64) -> Result<&RiskTier, PredictionError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(PredictionError::InvalidProbability(p));
        }
        // First tier starts at 0.0, so at least one lower bound is <= p.
        let idx = self.tiers.partition_point(|t| t.low <= p).saturating_sub(1);
        Ok(&self.tiers[idx])
    }

    #[must_use]
    pub fn tiers(&self) -> &[RiskTier] {
        &self.tiers
    }

    #[must_use]
    pub fn lowest(&self) -> &RiskTier {
        &self.tiers[0]
    }

    #[must_use]
    pub fn highest(&self) -> &RiskTier {
        &self.tiers[self.tiers.len() - 1]
    }
}
