//! Manifest utility for PEDE Risk model directories.
//!
//! Writes `manifest.json` with the SHA-256 digest of every artifact present
//! in the directory, then loads the directory once to confirm the result is
//! a usable bundle.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hash_artifacts -- <model_dir> [--no-verify]
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use pede_risk::adapters::artifacts::{
    sha256_hex, ArtifactManifest, ARTIFACT_FILES, MANIFEST_FILE, MANIFEST_VERSION, MODEL_FILE,
};
use pede_risk::adapters::ArtifactStore;
use pede_risk::ports::ModelStore;

fn usage() -> String {
    "Usage: hash_artifacts <model_dir> [--no-verify]".to_string()
}

fn parse_args() -> Result<(PathBuf, bool), String> {
    let mut model_dir: Option<PathBuf> = None;
    let mut verify = true;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--no-verify" => verify = false,
            "-h" | "--help" => return Err(usage()),
            _ => {
                if model_dir.is_none() {
                    model_dir = Some(PathBuf::from(arg));
                } else {
                    return Err(usage());
                }
            }
        }
    }

    let model_dir = model_dir.ok_or_else(usage)?;
    Ok((model_dir, verify))
}

fn main() -> Result<(), String> {
    let (model_dir, verify) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
            .to_path_buf()
    } else {
        model_dir
    };

    let mut files: BTreeMap<String, String> = BTreeMap::new();
    for rel in ARTIFACT_FILES {
        let path = model_dir.join(rel);
        if !path.exists() {
            continue;
        }
        let bytes = fs::read(&path).map_err(|e| format!("Failed to read {path:?}: {e}"))?;
        files.insert(rel.to_string(), sha256_hex(&bytes));
    }

    if !files.contains_key(MODEL_FILE) {
        return Err(format!("No {MODEL_FILE} found in {model_dir:?}"));
    }

    let manifest = ArtifactManifest {
        version: MANIFEST_VERSION,
        files,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize {MANIFEST_FILE}: {e}"))?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Wrote manifest: {manifest_path:?}");
    for (name, digest) in &manifest.files {
        println!("  {name}  {digest}");
    }

    if verify {
        let bundle = ArtifactStore::new(&model_dir)
            .load()
            .map_err(|e| format!("Manifest written but the bundle does not load: {e}"))?;
        println!(
            "Verified: {} features, {} classes, {} tiers",
            bundle.schema().len(),
            bundle.classifier().classes().len(),
            bundle.tiers().tiers().len()
        );
    }

    Ok(())
}
