//! Model signing utility for cardiorisk artifacts.
//!
//! Creates a signed manifest (`manifest.json`) and Ed25519 signature
//! (`model.sig`) binding `model.json`, so the loader can verify it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- <model_dir>
//! ```
//!
//! The 32-byte signing seed (base64) is read from the file named by
//! `CARDIORISK_MODEL_SIGNING_KEY_B64_FILE`, or in debug builds from
//! `CARDIORISK_MODEL_SIGNING_KEY_B64`. Seed material is zeroized after use.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardiorisk::adapters::artifact::{sign_artifact, ArtifactModel, ExportedModel, MODEL_FILE};

const KEY_FILE_ENV: &str = "CARDIORISK_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "CARDIORISK_MODEL_SIGNING_KEY_B64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        );
        let secret = content.trim_end_matches(['\n', '\r']).to_string();
        if secret.is_empty() {
            bail!("Empty signing key");
        }
        return Ok(Zeroizing::new(secret));
    }

    // Dev-only fallback for convenience.
    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_ENV) {
            let secret = v.trim_end_matches(['\n', '\r']).to_string();
            if secret.is_empty() {
                bail!("Empty signing key");
            }
            return Ok(Zeroizing::new(secret));
        }
    }

    bail!("Missing signing key. Provide {KEY_FILE_ENV} ({KEY_ENV} is accepted in debug builds only).")
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| anyhow!("Invalid base64 in signing key: {e}"))?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&raw);
    Ok(Seed(seed))
}

fn parse_args() -> Result<PathBuf> {
    let usage = "Usage: sign_model <model_dir>";
    let mut args = env::args().skip(1);
    let dir = args.next().ok_or_else(|| anyhow!(usage))?;
    if dir == "-h" || dir == "--help" || args.next().is_some() {
        bail!(usage);
    }
    Ok(PathBuf::from(dir))
}

fn main() -> Result<()> {
    let model_dir = parse_args()?;
    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| anyhow!("Model path has no parent directory"))?
            .to_path_buf()
    } else {
        model_dir
    };

    // Refuse to sign something the loader would reject anyway.
    let model_path = model_dir.join(MODEL_FILE);
    let bytes = fs::read(&model_path).with_context(|| format!("Failed to read {model_path:?}"))?;
    let exported: ExportedModel = serde_json::from_slice(&bytes)
        .with_context(|| format!("{model_path:?} is not a valid model export"))?;
    ArtifactModel::from_exported(exported, &model_path)?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = sign_artifact(&model_dir, &signing_key)?;

    println!("Signed {} file(s) in {model_dir:?}", manifest.files.len());
    println!(
        "Verifying key (base64)={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
    );

    Ok(())
}
