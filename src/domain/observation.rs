//! Clinical observation types for heart disease screening.
//!
//! Thirteen parameters, each with a fixed domain. Categorical inputs are
//! closed enums carrying the integer code the classifier was trained on.

use std::ops::RangeInclusive;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::features::{Feature, ValidationError, FEATURE_COUNT};

/// Age in years.
pub const AGE_RANGE: RangeInclusive<u32> = 20..=100;
/// Resting blood pressure in mmHg.
pub const RESTING_BP_RANGE: RangeInclusive<u32> = 80..=200;
/// Serum cholesterol in mg/dL.
pub const CHOLESTEROL_RANGE: RangeInclusive<u32> = 100..=600;
/// Maximum heart rate achieved during the exercise test.
pub const MAX_HEART_RATE_RANGE: RangeInclusive<u32> = 70..=220;
/// Exercise-induced ST depression relative to rest (oldpeak).
pub const ST_DEPRESSION_RANGE: RangeInclusive<f64> = 0.0..=6.0;
/// ST depression is entered in tenths.
pub const ST_DEPRESSION_STEP: f64 = 0.1;
/// Number of major vessels colored by fluoroscopy.
pub const MAJOR_VESSELS_RANGE: RangeInclusive<u8> = 0..=3;

/// Biological sex as encoded at training time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female = 0,
    Male = 1,
}

impl Sex {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Female),
            1 => Some(Self::Male),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }
}

/// Type of chest pain experienced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestPainType {
    Typical = 0,
    Atypical = 1,
    NonAnginal = 2,
    Asymptomatic = 3,
}

impl ChestPainType {
    pub const ALL: [Self; 4] = [
        Self::Typical,
        Self::Atypical,
        Self::NonAnginal,
        Self::Asymptomatic,
    ];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Typical),
            1 => Some(Self::Atypical),
            2 => Some(Self::NonAnginal),
            3 => Some(Self::Asymptomatic),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Typical => "Typical Angina",
            Self::Atypical => "Atypical Angina",
            Self::NonAnginal => "Non-Anginal Pain",
            Self::Asymptomatic => "Asymptomatic",
        }
    }
}

/// Resting electrocardiogram finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestingEcg {
    Normal = 0,
    StTAbnormality = 1,
    Lvh = 2,
}

impl RestingEcg {
    pub const ALL: [Self; 3] = [Self::Normal, Self::StTAbnormality, Self::Lvh];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::StTAbnormality),
            2 => Some(Self::Lvh),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::StTAbnormality => "ST-T Abnormality",
            Self::Lvh => "Left Ventricular Hypertrophy",
        }
    }
}

/// Slope of the peak exercise ST segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StSlope {
    Upsloping = 0,
    Flat = 1,
    Downsloping = 2,
}

impl StSlope {
    pub const ALL: [Self; 3] = [Self::Upsloping, Self::Flat, Self::Downsloping];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Upsloping),
            1 => Some(Self::Flat),
            2 => Some(Self::Downsloping),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Upsloping => "Upsloping",
            Self::Flat => "Flat",
            Self::Downsloping => "Downsloping",
        }
    }
}

/// Thalassemia status. Codes start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thalassemia {
    Normal = 1,
    FixedDefect = 2,
    ReversibleDefect = 3,
}

impl Thalassemia {
    pub const ALL: [Self; 3] = [Self::Normal, Self::FixedDefect, Self::ReversibleDefect];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            2 => Some(Self::FixedDefect),
            3 => Some(Self::ReversibleDefect),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::FixedDefect => "Fixed Defect",
            Self::ReversibleDefect => "Reversible Defect",
        }
    }
}

/// One screening request: the thirteen clinical parameters.
///
/// Built fresh per request and never persisted. Numeric fields are only
/// checked against their domains when the feature vector is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalObservation {
    pub age: u32,
    pub sex: Sex,
    pub chest_pain_type: ChestPainType,
    /// Resting blood pressure (mmHg)
    pub resting_bp: u32,
    /// Serum cholesterol (mg/dL)
    pub cholesterol: u32,
    /// Fasting blood sugar > 120 mg/dL
    pub fasting_sugar_high: bool,
    pub resting_ecg: RestingEcg,
    pub max_heart_rate: u32,
    pub exercise_angina: bool,
    pub st_depression: f64,
    pub st_slope: StSlope,
    pub major_vessels: u8,
    pub thalassemia: Thalassemia,
}

impl Default for ClinicalObservation {
    /// Initial values of the screening form.
    fn default() -> Self {
        Self {
            age: 50,
            sex: Sex::Male,
            chest_pain_type: ChestPainType::Typical,
            resting_bp: 120,
            cholesterol: 200,
            fasting_sugar_high: false,
            resting_ecg: RestingEcg::Normal,
            max_heart_rate: 150,
            exercise_angina: false,
            st_depression: 1.0,
            st_slope: StSlope::Upsloping,
            major_vessels: 0,
            thalassemia: Thalassemia::Normal,
        }
    }
}

impl ClinicalObservation {
    /// Decode a raw row of codes in training order.
    ///
    /// Only checks that each value is representable (integral where
    /// required, a known enum code, 0/1 for flags). Domain ranges are
    /// enforced by [`super::features::build`].
    ///
    /// # Errors
    /// Returns `ValidationError` naming the first undecodable field.
    pub fn from_codes(row: &[f64; FEATURE_COUNT]) -> Result<Self, ValidationError> {
        let at = |f: Feature| row[f.index()];

        Ok(Self {
            age: unsigned(Feature::Age, at(Feature::Age))?,
            sex: enum_code(Feature::Sex, at(Feature::Sex), Sex::from_code)?,
            chest_pain_type: enum_code(
                Feature::ChestPainType,
                at(Feature::ChestPainType),
                ChestPainType::from_code,
            )?,
            resting_bp: unsigned(Feature::RestingBp, at(Feature::RestingBp))?,
            cholesterol: unsigned(Feature::Cholesterol, at(Feature::Cholesterol))?,
            fasting_sugar_high: flag(Feature::FastingSugarHigh, at(Feature::FastingSugarHigh))?,
            resting_ecg: enum_code(
                Feature::RestingEcg,
                at(Feature::RestingEcg),
                RestingEcg::from_code,
            )?,
            max_heart_rate: unsigned(Feature::MaxHeartRate, at(Feature::MaxHeartRate))?,
            exercise_angina: flag(Feature::ExerciseAngina, at(Feature::ExerciseAngina))?,
            st_depression: finite(Feature::StDepression, at(Feature::StDepression))?,
            st_slope: enum_code(Feature::StSlope, at(Feature::StSlope), StSlope::from_code)?,
            major_vessels: unsigned(Feature::MajorVessels, at(Feature::MajorVessels))?,
            thalassemia: enum_code(
                Feature::Thalassemia,
                at(Feature::Thalassemia),
                Thalassemia::from_code,
            )?,
        })
    }

    /// Decode a loosely typed JSON object, as submitted by a form.
    ///
    /// Categorical fields accept their snake_case name or their integer
    /// code, flags accept a boolean or 0/1. Unknown keys are ignored.
    /// Domain ranges are still left to [`super::features::build`].
    ///
    /// # Errors
    /// Returns `ValidationError` naming the first missing or undecodable
    /// field, in training order.
    pub fn from_json(input: &Value) -> Result<Self, ValidationError> {
        let mut row = [0.0; FEATURE_COUNT];
        for field in Feature::ORDER {
            row[field.index()] = json_code(field, input.get(field.name()))?;
        }
        Self::from_codes(&row)
    }
}

fn json_code(field: Feature, value: Option<&Value>) -> Result<f64, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::new(field, "missing")),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ValidationError::new(field, format!("{n} is not a number"))),
        Some(Value::Bool(b)) if is_flag(field) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(name)) if is_categorical(field) => named_code(field, name)
            .map(f64::from)
            .ok_or_else(|| ValidationError::new(field, format!("unknown value '{name}'"))),
        Some(_) if is_flag(field) => Err(ValidationError::new(field, "expected true or false")),
        Some(_) => Err(ValidationError::new(field, "expected a number")),
    }
}

fn is_flag(field: Feature) -> bool {
    matches!(field, Feature::FastingSugarHigh | Feature::ExerciseAngina)
}

fn is_categorical(field: Feature) -> bool {
    matches!(
        field,
        Feature::Sex
            | Feature::ChestPainType
            | Feature::RestingEcg
            | Feature::StSlope
            | Feature::Thalassemia
    )
}

/// Code of a categorical value given by its serialized name.
fn named_code(field: Feature, name: &str) -> Option<u8> {
    fn parse<T: DeserializeOwned>(name: &str) -> Option<T> {
        serde_json::from_value(Value::String(name.to_string())).ok()
    }

    match field {
        Feature::Sex => parse::<Sex>(name).map(Sex::code),
        Feature::ChestPainType => parse::<ChestPainType>(name).map(ChestPainType::code),
        Feature::RestingEcg => parse::<RestingEcg>(name).map(RestingEcg::code),
        Feature::StSlope => parse::<StSlope>(name).map(StSlope::code),
        Feature::Thalassemia => parse::<Thalassemia>(name).map(Thalassemia::code),
        _ => None,
    }
}

fn finite(field: Feature, v: f64) -> Result<f64, ValidationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ValidationError::new(field, format!("{v} is not a finite number")))
    }
}

fn integral(field: Feature, v: f64) -> Result<i64, ValidationError> {
    let v = finite(field, v)?;
    if v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
        return Err(ValidationError::new(field, format!("{v} is not an integer")));
    }
    Ok(v as i64)
}

fn unsigned<T: TryFrom<i64>>(field: Feature, v: f64) -> Result<T, ValidationError> {
    let i = integral(field, v)?;
    T::try_from(i).map_err(|_| ValidationError::new(field, format!("{i} is out of range")))
}

fn flag(field: Feature, v: f64) -> Result<bool, ValidationError> {
    match integral(field, v)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ValidationError::new(field, format!("{other} must be 0 or 1"))),
    }
}

fn enum_code<T>(
    field: Feature,
    v: f64,
    decode: impl Fn(i64) -> Option<T>,
) -> Result<T, ValidationError> {
    let code = integral(field, v)?;
    decode(code).ok_or_else(|| ValidationError::new(field, format!("unknown code {code}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_codes_match_training_encoding() {
        assert_eq!(Sex::Male.code(), 1);
        assert_eq!(Sex::Female.code(), 0);
        assert_eq!(ChestPainType::Asymptomatic.code(), 3);
        assert_eq!(RestingEcg::Lvh.code(), 2);
        assert_eq!(StSlope::Downsloping.code(), 2);
        assert_eq!(Thalassemia::Normal.code(), 1);
        assert_eq!(Thalassemia::ReversibleDefect.code(), 3);
    }

    #[test]
    fn test_from_code_roundtrips_every_variant() {
        for v in ChestPainType::ALL {
            assert_eq!(ChestPainType::from_code(i64::from(v.code())), Some(v));
        }
        for v in Thalassemia::ALL {
            assert_eq!(Thalassemia::from_code(i64::from(v.code())), Some(v));
        }
        assert_eq!(Thalassemia::from_code(0), None);
        assert_eq!(RestingEcg::from_code(3), None);
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&ClinicalObservation::default()).expect("serialize");
        assert!(json.contains("\"chest_pain_type\":\"typical\""));
        assert!(json.contains("\"thalassemia\":\"normal\""));

        let parsed: StSlope = serde_json::from_str("\"downsloping\"").expect("parse");
        assert_eq!(parsed, StSlope::Downsloping);
        assert!(serde_json::from_str::<RestingEcg>("\"st_t_abnormality\"").is_ok());
    }

    fn form_json() -> Value {
        serde_json::json!({
            "age": 63,
            "sex": "male",
            "chest_pain_type": 3,
            "resting_bp": 145,
            "cholesterol": 233,
            "fasting_sugar_high": true,
            "resting_ecg": "normal",
            "max_heart_rate": 150,
            "exercise_angina": 0,
            "st_depression": 2.3,
            "st_slope": "upsloping",
            "major_vessels": 0,
            "thalassemia": "fixed_defect"
        })
    }

    #[test]
    fn test_from_json_accepts_names_and_codes() {
        let obs = ClinicalObservation::from_json(&form_json()).expect("Should decode");
        assert_eq!(obs.age, 63);
        assert_eq!(obs.sex, Sex::Male);
        assert_eq!(obs.chest_pain_type, ChestPainType::Asymptomatic);
        assert!(obs.fasting_sugar_high);
        assert!(!obs.exercise_angina);
        assert_eq!(obs.thalassemia, Thalassemia::FixedDefect);

        let default = ClinicalObservation::default();
        let value = serde_json::to_value(&default).expect("serialize");
        assert_eq!(ClinicalObservation::from_json(&value).expect("decode"), default);
    }

    #[test]
    fn test_from_json_negative_age_names_age() {
        let mut input = form_json();
        input["age"] = serde_json::json!(-5);
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::Age);

        input["age"] = serde_json::json!(1e12);
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::Age);
    }

    #[test]
    fn test_from_json_missing_field() {
        let mut input = form_json();
        input
            .as_object_mut()
            .expect("object")
            .remove("thalassemia");
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::Thalassemia);
        assert_eq!(err.reason, "missing");

        let err = ClinicalObservation::from_json(&serde_json::json!([1, 2])).expect_err("must fail");
        assert_eq!(err.field, Feature::Age);
    }

    #[test]
    fn test_from_json_unknown_codes_and_types() {
        let mut input = form_json();
        input["sex"] = serde_json::json!(2);
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::Sex);

        input["sex"] = serde_json::json!("other");
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::Sex);

        input["sex"] = serde_json::json!(0);
        input["resting_bp"] = serde_json::json!("145");
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::RestingBp);

        input["resting_bp"] = serde_json::json!(145);
        input["exercise_angina"] = serde_json::json!("yes");
        let err = ClinicalObservation::from_json(&input).expect_err("must fail");
        assert_eq!(err.field, Feature::ExerciseAngina);
    }

    #[test]
    fn test_from_codes() {
        let row = [
            63.0, 1.0, 3.0, 145.0, 233.0, 1.0, 0.0, 150.0, 0.0, 2.3, 0.0, 0.0, 1.0,
        ];
        let obs = ClinicalObservation::from_codes(&row).expect("Should decode");
        assert_eq!(obs.age, 63);
        assert_eq!(obs.sex, Sex::Male);
        assert_eq!(obs.chest_pain_type, ChestPainType::Asymptomatic);
        assert!(obs.fasting_sugar_high);
        assert!(!obs.exercise_angina);
        assert!((obs.st_depression - 2.3).abs() < f64::EPSILON);
        assert_eq!(obs.thalassemia, Thalassemia::Normal);
    }

    #[test]
    fn test_from_codes_names_offending_field() {
        let mut row = [
            63.0, 1.0, 3.0, 145.0, 233.0, 1.0, 0.0, 150.0, 0.0, 2.3, 0.0, 0.0, 1.0,
        ];
        row[Feature::Thalassemia.index()] = 0.0;
        let err = ClinicalObservation::from_codes(&row).expect_err("must fail");
        assert_eq!(err.field, Feature::Thalassemia);

        row[Feature::Thalassemia.index()] = 1.0;
        row[Feature::ExerciseAngina.index()] = 2.0;
        let err = ClinicalObservation::from_codes(&row).expect_err("must fail");
        assert_eq!(err.field, Feature::ExerciseAngina);

        row[Feature::ExerciseAngina.index()] = 0.0;
        row[Feature::Age.index()] = 54.5;
        let err = ClinicalObservation::from_codes(&row).expect_err("must fail");
        assert_eq!(err.field, Feature::Age);

        row[Feature::Age.index()] = -3.0;
        let err = ClinicalObservation::from_codes(&row).expect_err("must fail");
        assert_eq!(err.field, Feature::Age);

        row[Feature::Age.index()] = 54.0;
        row[Feature::StDepression.index()] = f64::NAN;
        let err = ClinicalObservation::from_codes(&row).expect_err("must fail");
        assert_eq!(err.field, Feature::StDepression);
    }
}
