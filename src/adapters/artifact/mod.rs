//! Artifact adapter: Implementation of ModelLoader over a JSON model export.
//!
//! A model directory contains:
//! - `model.json`: the exported estimator (see [`ExportedModel`])
//! - `manifest.json`: SHA-256 digests of the bound files
//! - `model.sig`: Ed25519 signature over the exact manifest bytes
//!
//! # Security
//!
//! - With a verifying key configured, the manifest signature and the digest
//!   of `model.json` must both check out, otherwise the model is unavailable
//! - The digest is computed over the same bytes that are parsed
//! - Without a key, loading is refused unless unsigned models are
//!   explicitly allowed (see `Settings`)

mod estimator;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use estimator::{DecisionTree, Estimator, LogisticRegression, RandomForest, StandardScaler};

use crate::config::Settings;
use crate::domain::{FeatureVector, FEATURE_NAMES};
use crate::ports::{ArtifactUnavailable, Classifier, ModelLoader};
use crate::CardioRiskError;

pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Current `model.json` layout.
pub const FORMAT_VERSION: u32 = 1;
/// Current `manifest.json` layout.
pub const MANIFEST_VERSION: u32 = 1;

/// Model export written by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedModel {
    pub format_version: u32,
    /// Must equal the crate's feature order exactly.
    pub feature_names: Vec<String>,
    pub estimator: Estimator,
}

impl ExportedModel {
    /// Wrap an estimator with the current format version and feature order.
    #[must_use]
    pub fn new(estimator: Estimator) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            estimator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds) of signing.
    pub created_at: i64,
    /// Random 16-byte nonce, base64.
    pub nonce_b64: String,
    /// File name to SHA-256 hex digest.
    pub files: BTreeMap<String, String>,
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
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

/// Parse a base64-encoded Ed25519 verifying key.
///
/// # Errors
/// Returns a description if the key is not 32 valid bytes.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| "Invalid public key base64".to_string())?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| "Invalid public key length (expected 32 bytes)".to_string())?;
    VerifyingKey::from_bytes(&key).map_err(|_| "Invalid verifying key".to_string())
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Write `manifest.json` and `model.sig` binding the current `model.json`.
///
/// # Errors
/// Returns error if the model file cannot be read or the outputs written.
pub fn sign_artifact(
    model_dir: &Path,
    signing_key: &SigningKey,
) -> Result<SignedModelManifest, CardioRiskError> {
    let model_bytes = std::fs::read(model_dir.join(MODEL_FILE))?;

    let mut nonce = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let manifest = SignedModelManifest {
        version: MANIFEST_VERSION,
        created_at: unix_now(),
        nonce_b64: base64::engine::general_purpose::STANDARD.encode(nonce),
        files: BTreeMap::from([(MODEL_FILE.to_string(), sha256_hex(&model_bytes))]),
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
    std::fs::write(model_dir.join(MANIFEST_FILE), &manifest_bytes)?;

    let signature: Signature = signing_key.sign(&manifest_bytes);
    std::fs::write(model_dir.join(SIGNATURE_FILE), signature.to_bytes())?;

    Ok(manifest)
}

/// A verified, validated model ready for inference.
#[derive(Debug, Clone)]
pub struct ArtifactModel {
    estimator: Estimator,
    source: PathBuf,
}

impl ArtifactModel {
    /// Check the feature order and estimator structure of an export.
    ///
    /// # Errors
    /// Returns `ArtifactUnavailable` describing the first mismatch.
    pub fn from_exported(
        exported: ExportedModel,
        source: impl Into<PathBuf>,
    ) -> Result<Self, ArtifactUnavailable> {
        if exported.format_version != FORMAT_VERSION {
            return Err(ArtifactUnavailable::new(format!(
                "Unsupported model format version {} (expected {FORMAT_VERSION})",
                exported.format_version
            )));
        }
        if exported.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(ArtifactUnavailable::new(format!(
                "Model feature order {:?} does not match expected {:?}",
                exported.feature_names, FEATURE_NAMES
            )));
        }
        exported
            .estimator
            .validate()
            .map_err(|e| ArtifactUnavailable::new(format!("Invalid {}: {e}", exported.estimator.kind())))?;

        Ok(Self {
            estimator: exported.estimator,
            source: source.into(),
        })
    }

    #[must_use]
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }
}

impl Classifier for ArtifactModel {
    fn predict_one(&self, features: &FeatureVector) -> i64 {
        self.estimator.predict(features)
    }

    fn describe(&self) -> String {
        format!("{} from {:?}", self.estimator.kind(), self.source)
    }
}

/// Loads `model.json` from a model directory.
pub struct ArtifactLoader {
    model_dir: PathBuf,
    verifying_key: Option<VerifyingKey>,
    allow_unsigned: bool,
}

impl ArtifactLoader {
    /// Create a loader that requires a signed model but has no key yet.
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            verifying_key: None,
            allow_unsigned: false,
        }
    }

    #[must_use]
    pub fn with_verifying_key(mut self, key: VerifyingKey) -> Self {
        self.verifying_key = Some(key);
        self
    }

    /// Permit loading without a verifying key. Ignored once a key is set.
    #[must_use]
    pub fn allow_unsigned(mut self, allow: bool) -> Self {
        self.allow_unsigned = allow;
        self
    }

    /// Build a loader from resolved settings.
    ///
    /// # Errors
    /// Returns `CardioRiskError::Config` if the configured key is malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self, CardioRiskError> {
        let mut loader =
            Self::new(&settings.model_dir).allow_unsigned(settings.allow_unsigned_models);
        if let Some(b64) = &settings.signing_pubkey_b64 {
            let key = verifying_key_from_b64(b64).map_err(CardioRiskError::Config)?;
            loader = loader.with_verifying_key(key);
        }
        Ok(loader)
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Verify `model_bytes` against the signed manifest.
    fn verify_signature(&self, model_bytes: &[u8]) -> Result<(), ArtifactUnavailable> {
        let Some(key) = &self.verifying_key else {
            if self.allow_unsigned {
                tracing::warn!("Loading unsigned model: signature verification is disabled");
                return Ok(());
            }
            return Err(ArtifactUnavailable::new(
                "No model verifying key configured and unsigned models are not allowed",
            ));
        };

        let manifest_path = self.model_dir.join(MANIFEST_FILE);
        let manifest_bytes = std::fs::read(&manifest_path).map_err(|e| {
            ArtifactUnavailable::new(format!("Failed to read {manifest_path:?}: {e}"))
        })?;
        let sig_path = self.model_dir.join(SIGNATURE_FILE);
        let sig_bytes = std::fs::read(&sig_path)
            .map_err(|e| ArtifactUnavailable::new(format!("Failed to read {sig_path:?}: {e}")))?;

        let sig: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            ArtifactUnavailable::new("Invalid signature length (expected 64 bytes)")
        })?;
        key.verify(&manifest_bytes, &Signature::from_bytes(&sig))
            .map_err(|_| ArtifactUnavailable::new("Invalid model signature"))?;

        let manifest: SignedModelManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| ArtifactUnavailable::new(format!("Invalid manifest format: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactUnavailable::new(format!(
                "Unsupported manifest version {}",
                manifest.version
            )));
        }

        let expected = manifest.files.get(MODEL_FILE).ok_or_else(|| {
            ArtifactUnavailable::new(format!("Manifest does not bind {MODEL_FILE}"))
        })?;
        if !constant_time_eq_str(expected, &sha256_hex(model_bytes)) {
            return Err(ArtifactUnavailable::new(format!(
                "{MODEL_FILE} does not match the signed manifest"
            )));
        }

        tracing::info!("Model signature and digest verified");
        Ok(())
    }
}

impl ModelLoader for ArtifactLoader {
    type Model = ArtifactModel;

    fn load(&self) -> Result<ArtifactModel, ArtifactUnavailable> {
        let model_path = self.model_dir.join(MODEL_FILE);
        let model_bytes = std::fs::read(&model_path).map_err(|e| {
            ArtifactUnavailable::new(format!("Model file not found at {model_path:?}: {e}"))
        })?;

        self.verify_signature(&model_bytes)?;

        let exported: ExportedModel = serde_json::from_slice(&model_bytes).map_err(|e| {
            ArtifactUnavailable::new(format!("Failed to deserialize {model_path:?}: {e}"))
        })?;
        let model = ArtifactModel::from_exported(exported, &model_path)?;

        tracing::info!(
            "Loaded {} model from {:?}",
            model.estimator().kind(),
            model_path
        );
        Ok(model)
    }
}
