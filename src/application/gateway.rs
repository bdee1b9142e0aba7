//! Model gateway: Process-wide, load-once access to the classifier.

use std::sync::OnceLock;

use crate::domain::FeatureVector;
use crate::ports::{ArtifactUnavailable, Classifier, ModelLoader};

/// Lazily loads the classifier artifact and caches the outcome.
///
/// The loader runs on first use only. A failure is cached just like a
/// success: prediction stays disabled until the process restarts.
/// `OnceLock` guarantees a single load even with concurrent callers.
pub struct ModelGateway<L>
where
    L: ModelLoader,
{
    loader: L,
    model: OnceLock<Result<L::Model, ArtifactUnavailable>>,
}

impl<L> ModelGateway<L>
where
    L: ModelLoader,
{
    /// Create a gateway. Nothing is loaded until first use.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            model: OnceLock::new(),
        }
    }

    /// Get the cached classifier, loading it on first call.
    ///
    /// # Errors
    /// Returns the (cached) `ArtifactUnavailable` if loading failed.
    pub fn load(&self) -> Result<&L::Model, ArtifactUnavailable> {
        self.model
            .get_or_init(|| {
                tracing::info!("Loading classifier artifact...");
                match self.loader.load() {
                    Ok(model) => {
                        tracing::info!("Classifier ready: {}", model.describe());
                        Ok(model)
                    }
                    Err(e) => {
                        tracing::warn!("Prediction disabled: {}", e);
                        Err(e)
                    }
                }
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Whether a classifier is available. Triggers the load if needed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.load().is_ok()
    }

    /// Run inference on one validated vector.
    #[must_use]
    pub fn infer(&self, model: &L::Model, features: &FeatureVector) -> i64 {
        model.predict_one(features)
    }
}
