//! Classifier port: Traits for the opaque model artifact.
//!
//! The application only ever sees "predict one row" and "load once". The
//! artifact format and the library behind it stay in the adapters.

use crate::domain::FeatureVector;

/// The model artifact could not be located, verified or deserialized.
///
/// Cloneable so the gateway can cache the failure for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("model artifact unavailable: {reason}")]
pub struct ArtifactUnavailable {
    pub reason: String,
}

impl ArtifactUnavailable {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A loaded binary classifier.
///
/// Implementations must be deterministic and free of side effects: the same
/// vector always yields the same raw output. The output is returned as-is;
/// mapping it to a label (and rejecting anything outside {0, 1}) is the
/// caller's job.
pub trait Classifier: Send + Sync {
    /// Predict the class of a single feature row.
    fn predict_one(&self, features: &FeatureVector) -> i64;

    /// Short description for logs (estimator kind, source).
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Source of a classifier. Called at most once per gateway.
pub trait ModelLoader: Send + Sync {
    type Model: Classifier;

    /// Locate, verify and deserialize the artifact.
    ///
    /// # Errors
    /// Returns `ArtifactUnavailable` if the artifact is missing, fails its
    /// integrity check, or cannot be deserialized.
    fn load(&self) -> Result<Self::Model, ArtifactUnavailable>;
}
