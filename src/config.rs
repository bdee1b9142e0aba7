//! Runtime settings resolved from `CARDIORISK_*` environment variables.
//!
//! Only the binaries read the environment. The library receives a
//! `Settings` value and never looks at the process environment itself.

use std::path::PathBuf;

use crate::adapters::sanitize::DEFAULT_SANITIZE_MAX_BYTES;
use crate::CardioRiskError;

const MODEL_DIR_ENV: &str = "CARDIORISK_MODEL_DIR";
const PUBKEY_ENV: &str = "CARDIORISK_MODEL_SIGNING_PUBKEY_B64";
const PUBKEY_FILE_ENV: &str = "CARDIORISK_MODEL_SIGNING_PUBKEY_B64_FILE";
const ALLOW_UNSIGNED_MODELS_ENV: &str = "CARDIORISK_ALLOW_UNSIGNED_MODELS";
const LOG_MODE_ENV: &str = "CARDIORISK_LOG_MODE";
const LOG_FILE_ENV: &str = "CARDIORISK_LOG_FILE";
const SANITIZE_MAX_BYTES_ENV: &str = "CARDIORISK_SANITIZE_MAX_BYTES";

/// Where log output goes.
///
/// Stdout is reserved for assessment output, so logs default to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

impl std::str::FromStr for LogMode {
    type Err = CardioRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stderr" | "auto" => Ok(Self::Stderr),
            "file" => Ok(Self::File),
            other => Err(CardioRiskError::Config(format!(
                "{LOG_MODE_ENV} must be 'stderr' or 'file', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding `model.json`, `manifest.json` and `model.sig`.
    pub model_dir: PathBuf,
    /// Base64 Ed25519 key used to verify the model manifest.
    pub signing_pubkey_b64: Option<String>,
    /// Load models without a signature. Only honoured in debug builds.
    pub allow_unsigned_models: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Per-line cap for log sanitization.
    pub sanitize_max_bytes: usize,
    /// Problems noticed while resolving, for logging once a subscriber exists.
    pub warnings: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            signing_pubkey_b64: None,
            allow_unsigned_models: false,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from("data/cardiorisk.log"),
            sanitize_max_bytes: DEFAULT_SANITIZE_MAX_BYTES,
            warnings: Vec::new(),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// # Errors
    /// Returns `Config` for malformed values, `Io` if a key file is unreadable.
    pub fn from_env() -> Result<Self, CardioRiskError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `Config` for malformed values, `Io` if a key file is unreadable.
    pub fn from_lookup<F>(get: F) -> Result<Self, CardioRiskError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(dir) = get(MODEL_DIR_ENV) {
            settings.model_dir = PathBuf::from(dir);
        }

        // A key file wins over an inline key.
        settings.signing_pubkey_b64 = match get(PUBKEY_FILE_ENV) {
            Some(path) => Some(std::fs::read_to_string(path.trim())?.trim().to_string()),
            None => get(PUBKEY_ENV).map(|v| v.trim().to_string()),
        }
        .filter(|v| !v.is_empty());

        let allow_unsigned = get(ALLOW_UNSIGNED_MODELS_ENV).is_some_and(|v| parse_bool(&v));
        if allow_unsigned && !cfg!(debug_assertions) {
            settings
                .warnings
                .push(format!("{ALLOW_UNSIGNED_MODELS_ENV} is ignored in release builds"));
        }
        settings.allow_unsigned_models = allow_unsigned && cfg!(debug_assertions);

        if let Some(mode) = get(LOG_MODE_ENV) {
            settings.log_mode = mode.parse()?;
        }
        if let Some(file) = get(LOG_FILE_ENV) {
            settings.log_file = PathBuf::from(file);
        }
        if let Some(v) = get(SANITIZE_MAX_BYTES_ENV) {
            settings.sanitize_max_bytes = v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    CardioRiskError::Config(format!(
                        "{SANITIZE_MAX_BYTES_ENV} must be a positive integer"
                    ))
                })?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(s.model_dir, PathBuf::from("models"));
        assert!(s.signing_pubkey_b64.is_none());
        assert!(!s.allow_unsigned_models);
        assert_eq!(s.log_mode, LogMode::Stderr);
        assert_eq!(s.sanitize_max_bytes, DEFAULT_SANITIZE_MAX_BYTES);
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn test_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("CARDIORISK_MODEL_DIR", "/srv/model"),
            ("CARDIORISK_MODEL_SIGNING_PUBKEY_B64", "  abc=  "),
            ("CARDIORISK_ALLOW_UNSIGNED_MODELS", "yes"),
            ("CARDIORISK_LOG_MODE", "FILE"),
            ("CARDIORISK_LOG_FILE", "/tmp/x.log"),
            ("CARDIORISK_SANITIZE_MAX_BYTES", "2048"),
        ]))
        .expect("settings");
        assert_eq!(s.model_dir, PathBuf::from("/srv/model"));
        assert_eq!(s.signing_pubkey_b64.as_deref(), Some("abc="));
        assert_eq!(s.allow_unsigned_models, cfg!(debug_assertions));
        assert_eq!(s.log_mode, LogMode::File);
        assert_eq!(s.log_file, PathBuf::from("/tmp/x.log"));
        assert_eq!(s.sanitize_max_bytes, 2048);
        // The unsigned opt-in is reported, not dropped, when it cannot apply.
        assert_eq!(s.warnings.is_empty(), cfg!(debug_assertions));
    }

    #[test]
    fn test_pubkey_file_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pub.b64");
        std::fs::write(&path, "filekey=\n").expect("write");

        let s = Settings::from_lookup(lookup(&[
            ("CARDIORISK_MODEL_SIGNING_PUBKEY_B64_FILE", path.to_str().expect("utf8")),
            ("CARDIORISK_MODEL_SIGNING_PUBKEY_B64", "inline="),
        ]))
        .expect("settings");
        assert_eq!(s.signing_pubkey_b64.as_deref(), Some("filekey="));
    }

    #[test]
    fn test_malformed_values() {
        assert!(Settings::from_lookup(lookup(&[("CARDIORISK_LOG_MODE", "syslog")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("CARDIORISK_SANITIZE_MAX_BYTES", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[(
            "CARDIORISK_MODEL_SIGNING_PUBKEY_B64_FILE",
            "/nonexistent/key.b64"
        )]))
        .is_err());
    }
}
