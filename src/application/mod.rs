//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the screening use case.

mod assessment;
mod gateway;

pub use assessment::{AssessmentError, RiskDecisionService};
pub use gateway::ModelGateway;
