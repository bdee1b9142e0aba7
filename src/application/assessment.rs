//! Risk decision service: One screening request, start to finish.
//!
//! This service coordinates:
//! - Model availability (degraded mode when the artifact is missing)
//! - Feature vector construction
//! - Inference and label mapping
//! - Input-derived flags and recommendations

use crate::domain::{build, ClinicalObservation, RiskAssessment, RiskLabel, ValidationError};
use crate::ports::{ArtifactUnavailable, ModelLoader};

use super::gateway::ModelGateway;

/// Why a screening request produced no assessment.
///
/// Every variant is recovered at the request boundary and shown to the
/// user; none of them is fatal to the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Unavailable(#[from] ArtifactUnavailable),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The artifact is not the binary classifier it claims to be.
    #[error("model contract violation: classifier returned {output}, expected 0 or 1")]
    ModelContractViolation { output: i64 },
}

impl AssessmentError {
    /// Message suitable for display next to the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(_) => "Prediction is currently unavailable: the model file could not be loaded. \
                 The form can still be filled in; restart the application once the model is in place."
                .to_string(),
            Self::Validation(e) => format!("Please correct {}: {}", e.field, e.reason),
            Self::ModelContractViolation { .. } => "The prediction model returned an unexpected result. \
                 The model file may be corrupt or mismatched and needs to be replaced."
                .to_string(),
        }
    }
}

/// Service for assessing heart disease risk.
///
/// Stateless apart from the gateway's cached classifier; share it behind an
/// `Arc` if the host serves requests concurrently.
pub struct RiskDecisionService<L>
where
    L: ModelLoader,
{
    gateway: ModelGateway<L>,
}

impl<L> RiskDecisionService<L>
where
    L: ModelLoader,
{
    /// Create a new decision service over a gateway.
    pub fn new(gateway: ModelGateway<L>) -> Self {
        Self { gateway }
    }

    /// Whether predictions can be made. The presentation layer uses this
    /// to disable its analyze action while still rendering the form.
    #[must_use]
    pub fn prediction_enabled(&self) -> bool {
        self.gateway.is_available()
    }

    /// Assess one observation.
    ///
    /// An unavailable model short-circuits before any validation or
    /// inference. Flags and recommendations are computed from the raw
    /// inputs and never depend on the predicted label.
    ///
    /// # Errors
    /// Returns `Unavailable`, `Validation` or `ModelContractViolation`.
    pub fn assess(&self, observation: &ClinicalObservation) -> Result<RiskAssessment, AssessmentError> {
        let model = self.gateway.load()?;

        tracing::debug!("Step 1: Building feature vector...");
        let features = build(observation).map_err(|e| {
            tracing::warn!(field = %e.field, "Observation rejected");
            e
        })?;

        tracing::debug!("Step 2: Running inference...");
        let output = self.gateway.infer(model, &features);

        let label = RiskLabel::from_output(output).ok_or_else(|| {
            tracing::warn!(output, "Classifier output outside {{0, 1}}");
            AssessmentError::ModelContractViolation { output }
        })?;

        tracing::debug!("Step 3: Deriving advisory flags...");
        let assessment = RiskAssessment::new(label, observation);

        tracing::info!(
            "Assessment complete: label={}, flags_raised={}",
            assessment.label,
            assessment.flags.any()
        );

        Ok(assessment)
    }

    /// Assess a raw JSON observation, as received from a form or the CLI.
    ///
    /// Decoding failures (missing fields, wrong types, unknown codes) are
    /// reported as `Validation` naming the field, after the availability
    /// check, exactly like out-of-range values.
    ///
    /// # Errors
    /// Returns `Unavailable`, `Validation` or `ModelContractViolation`.
    pub fn assess_json(&self, input: &serde_json::Value) -> Result<RiskAssessment, AssessmentError> {
        self.gateway.load()?;

        let observation = ClinicalObservation::from_json(input).map_err(|e| {
            tracing::warn!(field = %e.field, "Observation could not be decoded");
            e
        })?;
        self.assess(&observation)
    }
}
