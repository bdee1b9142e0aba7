//! Feature vector construction.
//!
//! The classifier was trained on thirteen columns in a fixed order. The
//! order lives in exactly one place, [`Feature::ORDER`], and everything
//! else (names, indices, the vector layout) is derived from it.

use serde::{Deserialize, Serialize};

use super::observation::{
    ClinicalObservation, AGE_RANGE, CHOLESTEROL_RANGE, MAJOR_VESSELS_RANGE, MAX_HEART_RATE_RANGE,
    RESTING_BP_RANGE, ST_DEPRESSION_RANGE, ST_DEPRESSION_STEP,
};

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 13;

/// Tolerance when checking that ST depression sits on the 0.1 grid.
const STEP_TOLERANCE: f64 = 1e-6;

/// One model input column. Discriminants are vector positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Age = 0,
    Sex = 1,
    ChestPainType = 2,
    RestingBp = 3,
    Cholesterol = 4,
    FastingSugarHigh = 5,
    RestingEcg = 6,
    MaxHeartRate = 7,
    ExerciseAngina = 8,
    StDepression = 9,
    StSlope = 10,
    MajorVessels = 11,
    Thalassemia = 12,
}

impl Feature {
    /// Training-time column order.
    pub const ORDER: [Self; FEATURE_COUNT] = [
        Self::Age,
        Self::Sex,
        Self::ChestPainType,
        Self::RestingBp,
        Self::Cholesterol,
        Self::FastingSugarHigh,
        Self::RestingEcg,
        Self::MaxHeartRate,
        Self::ExerciseAngina,
        Self::StDepression,
        Self::StSlope,
        Self::MajorVessels,
        Self::Thalassemia,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names, as they must appear in an exported model artifact.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "sex",
    "chest_pain_type",
    "resting_bp",
    "cholesterol",
    "fasting_sugar_high",
    "resting_ecg",
    "max_heart_rate",
    "exercise_angina",
    "st_depression",
    "st_slope",
    "major_vessels",
    "thalassemia",
];

/// A clinical input outside its declared domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: Feature,
    pub reason: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: Feature, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validated model input in training order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Validate an observation and encode it as a feature vector.
///
/// Fields are checked in vector order; the first one out of domain is
/// reported and no vector is produced.
///
/// # Errors
/// Returns `ValidationError` naming the offending field.
pub fn build(obs: &ClinicalObservation) -> Result<FeatureVector, ValidationError> {
    in_range(Feature::Age, obs.age, &AGE_RANGE)?;
    in_range(Feature::RestingBp, obs.resting_bp, &RESTING_BP_RANGE)?;
    in_range(Feature::Cholesterol, obs.cholesterol, &CHOLESTEROL_RANGE)?;
    in_range(Feature::MaxHeartRate, obs.max_heart_rate, &MAX_HEART_RATE_RANGE)?;
    check_st_depression(obs.st_depression)?;
    in_range(Feature::MajorVessels, obs.major_vessels, &MAJOR_VESSELS_RANGE)?;

    Ok(FeatureVector([
        f64::from(obs.age),
        f64::from(obs.sex.code()),
        f64::from(obs.chest_pain_type.code()),
        f64::from(obs.resting_bp),
        f64::from(obs.cholesterol),
        encode_flag(obs.fasting_sugar_high),
        f64::from(obs.resting_ecg.code()),
        f64::from(obs.max_heart_rate),
        encode_flag(obs.exercise_angina),
        obs.st_depression,
        f64::from(obs.st_slope.code()),
        f64::from(obs.major_vessels),
        f64::from(obs.thalassemia.code()),
    ]))
}

impl ClinicalObservation {
    /// See [`build`].
    ///
    /// # Errors
    /// Returns `ValidationError` naming the offending field.
    pub fn to_features(&self) -> Result<FeatureVector, ValidationError> {
        build(self)
    }
}

fn encode_flag(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

fn in_range<T>(
    field: Feature,
    value: T,
    range: &std::ops::RangeInclusive<T>,
) -> Result<(), ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("{value} out of range [{}, {}]", range.start(), range.end()),
        ))
    }
}

fn check_st_depression(v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::new(
            Feature::StDepression,
            format!("{v} is not a finite number"),
        ));
    }
    in_range(Feature::StDepression, v, &ST_DEPRESSION_RANGE)?;

    let steps = v / ST_DEPRESSION_STEP;
    if (steps - steps.round()).abs() > STEP_TOLERANCE {
        return Err(ValidationError::new(
            Feature::StDepression,
            format!("{v} is not a multiple of {ST_DEPRESSION_STEP}"),
        ));
    }
    Ok(())
}
