//! # Cardiorisk
//!
//! Decision-support core for heart disease screening.
//!
//! This crate provides:
//! - Validation of thirteen clinical inputs into a fixed-order feature vector
//! - Load-once access to a signed, opaque binary classifier artifact
//! - Risk labels with model-independent advisory flags and recommendations
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core screening types (observation, feature vector, assessment)
//! - `ports`: Trait definitions for the classifier artifact
//! - `adapters`: Concrete implementations (JSON model export, log sanitizing)
//! - `application`: Model gateway and risk decision service
//! - `config`: Environment-backed settings for the binaries

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{AssessmentError, ModelGateway, RiskDecisionService};
pub use domain::{ClinicalObservation, RiskAssessment, RiskLabel};

/// Result type for Cardiorisk operations
pub type Result<T> = std::result::Result<T, CardioRiskError>;

/// Main error type for Cardiorisk
#[derive(Debug, thiserror::Error)]
pub enum CardioRiskError {
    #[error("Assessment failed: {0}")]
    Assessment(#[from] AssessmentError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
