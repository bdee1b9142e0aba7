//! Domain layer: Core screening types and logic.
//!
//! Pure Rust types with no I/O. Everything here is serializable and
//! validated before it reaches the classifier.

mod assessment;
mod features;
mod observation;

pub use assessment::{
    AdvisoryFlags, KeyMetrics, MetricBand, ParameterProfile, RiskAssessment, RiskLabel,
    DEFAULT_RECOMMENDATIONS,
};
pub use features::{build, Feature, FeatureVector, ValidationError, FEATURE_COUNT, FEATURE_NAMES};
pub use observation::{
    ChestPainType, ClinicalObservation, RestingEcg, Sex, StSlope, Thalassemia,
};
