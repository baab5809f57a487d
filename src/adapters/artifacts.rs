//! Model store over a directory of exported artifacts.
//!
//! Layout (relative to the model directory):
//! - `features.txt`, `scaler.json`, `model.json` (required)
//! - `encoders.json`, `derivations.json`, `metadata.json`, `tiers.json`,
//!   `threshold.txt`, `manifest.json` (optional)
//!
//! When `manifest.json` is present every file it lists must hash to the
//! listed SHA-256 digest before anything else is parsed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::sklearn::{ExportedModel, StandardScaler};
use crate::domain::{CategoryEncoder, DerivationSet, ModelMetadata, TierSpec, TierTable};
use crate::ports::{BundleParts, ModelBundle, ModelLoadError, ModelStore};

pub const FEATURES_FILE: &str = "features.txt";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const DERIVATIONS_FILE: &str = "derivations.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const TIERS_FILE: &str = "tiers.json";
pub const THRESHOLD_FILE: &str = "threshold.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifacts covered by a manifest, in hashing order.
pub const ARTIFACT_FILES: [&str; 8] = [
    FEATURES_FILE,
    SCALER_FILE,
    MODEL_FILE,
    ENCODERS_FILE,
    DERIVATIONS_FILE,
    METADATA_FILE,
    TIERS_FILE,
    THRESHOLD_FILE,
];

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Parse `features.txt`: one name per line, trimmed, blank lines skipped.
/// A leading UTF-8 BOM is dropped.
///
/// # Errors
/// Returns `ModelLoadError::Malformed` on an empty list, a duplicate name or
/// a name carrying control or invisible format characters.
pub fn parse_feature_list(content: &str) -> Result<Vec<String>, ModelLoadError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut names: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.chars().any(is_hidden_char) {
            return Err(ModelLoadError::Malformed {
                artifact: FEATURES_FILE.to_string(),
                reason: format!("feature name {line:?} contains a hidden character"),
            });
        }
        if names.iter().any(|n| n == line) {
            return Err(ModelLoadError::Malformed {
                artifact: FEATURES_FILE.to_string(),
                reason: format!("duplicate feature {line}"),
            });
        }
        names.push(line.to_string());
    }
    if names.is_empty() {
        return Err(ModelLoadError::Malformed {
            artifact: FEATURES_FILE.to_string(),
            reason: "no feature names".to_string(),
        });
    }
    Ok(names)
}

fn is_hidden_char(c: char) -> bool {
    c.is_control() || matches!(c, '\u{200b}'..='\u{200f}' | '\u{2060}' | '\u{feff}')
}

/// `ModelStore` backed by a local directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_bytes(&self, name: &str) -> Result<Option<Vec<u8>>, ModelLoadError> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ModelLoadError::Unreadable {
                artifact: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn read_text(&self, name: &str) -> Result<Option<String>, ModelLoadError> {
        self.read_bytes(name)?
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|e| ModelLoadError::Unreadable {
                    artifact: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn require_text(&self, name: &str) -> Result<String, ModelLoadError> {
        self.read_text(name)?
            .ok_or_else(|| ModelLoadError::MissingArtifact(name.to_string()))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ModelLoadError> {
        self.read_text(name)?
            .map(|content| {
                serde_json::from_str(&content).map_err(|e| ModelLoadError::Malformed {
                    artifact: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn require_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ModelLoadError> {
        self.read_json(name)?
            .ok_or_else(|| ModelLoadError::MissingArtifact(name.to_string()))
    }

    /// Check every file listed in `manifest.json` against its digest.
    ///
    /// Returns `Ok(false)` when the directory carries no manifest.
    fn verify_manifest(&self) -> Result<bool, ModelLoadError> {
        let Some(manifest) = self.read_json::<ArtifactManifest>(MANIFEST_FILE)? else {
            return Ok(false);
        };
        if manifest.version != MANIFEST_VERSION {
            return Err(ModelLoadError::Malformed {
                artifact: MANIFEST_FILE.to_string(),
                reason: format!("unsupported manifest version {}", manifest.version),
            });
        }
        if !manifest.files.contains_key(MODEL_FILE) {
            return Err(ModelLoadError::Malformed {
                artifact: MANIFEST_FILE.to_string(),
                reason: format!("manifest must include {MODEL_FILE}"),
            });
        }
        for (rel, expected_hex) in &manifest.files {
            if Path::new(rel)
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
            {
                return Err(ModelLoadError::Malformed {
                    artifact: MANIFEST_FILE.to_string(),
                    reason: format!("invalid file entry {rel}"),
                });
            }
            let bytes = self
                .read_bytes(rel)?
                .ok_or_else(|| ModelLoadError::MissingArtifact(rel.clone()))?;
            if !constant_time_eq_str(&sha256_hex(&bytes), &expected_hex.to_ascii_lowercase()) {
                return Err(ModelLoadError::IntegrityMismatch(rel.clone()));
            }
        }
        Ok(true)
    }

    fn read_threshold(&self) -> Result<Option<f64>, ModelLoadError> {
        let Some(content) = self.read_text(THRESHOLD_FILE)? else {
            return Ok(None);
        };
        let value = content
            .trim()
            .parse::<f64>()
            .map_err(|e| ModelLoadError::Malformed {
                artifact: THRESHOLD_FILE.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(value))
    }
}

impl ModelStore for ArtifactStore {
    fn location(&self) -> PathBuf {
        self.dir.clone()
    }

    fn load(&self) -> Result<ModelBundle, ModelLoadError> {
        let verified = self.verify_manifest()?;

        let feature_names = parse_feature_list(&self.require_text(FEATURES_FILE)?)?;

        let scaler: StandardScaler = self.require_json(SCALER_FILE)?;
        scaler.validate().map_err(|reason| ModelLoadError::Malformed {
            artifact: SCALER_FILE.to_string(),
            reason,
        })?;

        let model: ExportedModel = self.require_json(MODEL_FILE)?;
        let classifier = model
            .into_classifier()
            .map_err(|reason| ModelLoadError::Malformed {
                artifact: MODEL_FILE.to_string(),
                reason,
            })?;

        let encoders = self
            .read_json::<BTreeMap<String, Vec<String>>>(ENCODERS_FILE)?
            .unwrap_or_default()
            .into_iter()
            .map(|(feature, vocab)| (feature, CategoryEncoder::new(vocab)))
            .collect();
        let derivations: Option<DerivationSet> = self.read_json(DERIVATIONS_FILE)?;
        let metadata: ModelMetadata = self.read_json(METADATA_FILE)?.unwrap_or_default();
        let tiers = self
            .read_json::<Vec<TierSpec>>(TIERS_FILE)?
            .map(TierTable::new)
            .transpose()?;
        let threshold = self.read_threshold()?;

        let classifier_name = classifier.name().to_string();
        let bundle = ModelBundle::from_parts(BundleParts {
            feature_names,
            scaler: Box::new(scaler),
            classifier,
            encoders,
            derivations,
            metadata,
            tiers,
            threshold,
        })?;

        tracing::info!(
            "Loaded model from {:?} ({}, n_features={}, tiers={}, manifest_verified={})",
            self.dir,
            classifier_name,
            bundle.schema().len(),
            bundle.tiers().tiers().len(),
            verified
        );
        Ok(bundle)
    }
}
