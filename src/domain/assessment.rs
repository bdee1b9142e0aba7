//! Risk assessment result types.
//!
//! The label comes from the classifier. Everything else here (advisory
//! flags, recommendations, metric bands, the parameter profile) is derived
//! from the raw observation alone and never looks at the model output.

use serde::{Deserialize, Serialize};

use super::observation::ClinicalObservation;

/// Resting blood pressure above which the BP flag is raised (mmHg).
pub const ELEVATED_BP_THRESHOLD: u32 = 140;
/// Cholesterol above which the cholesterol flag is raised (mg/dL).
pub const ELEVATED_CHOLESTEROL_THRESHOLD: u32 = 240;
/// Age above which regular screening is advised.
pub const ADVANCED_AGE_THRESHOLD: u32 = 60;
/// Maximum heart rate below which exercise capacity is flagged.
pub const LOW_EXERCISE_CAPACITY_THRESHOLD: u32 = 100;

const BORDERLINE_BP_THRESHOLD: u32 = 120;
const BORDERLINE_CHOLESTEROL_THRESHOLD: u32 = 200;

pub const MONITOR_BLOOD_PRESSURE: &str = "Monitor blood pressure regularly";
pub const REDUCE_CHOLESTEROL: &str = "Consider dietary changes to reduce cholesterol";
pub const CARDIAC_SCREENINGS: &str = "Schedule regular cardiac screenings";
pub const DISCUSS_EXERCISE_CAPACITY: &str = "Discuss exercise capacity with your doctor";

/// Returned when no advisory flag is raised.
pub const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
    "Maintain current healthy lifestyle",
    "Continue regular exercise routine",
    "Keep balanced diet",
];

/// Binary classifier outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    NoDisease,
    Disease,
}

impl RiskLabel {
    /// Map a raw classifier output. Only 0 and 1 are meaningful.
    #[must_use]
    pub fn from_output(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::NoDisease),
            1 => Some(Self::Disease),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::NoDisease => 0,
            Self::Disease => 1,
        }
    }

    /// Banner text for the result panel.
    #[must_use]
    pub fn headline(self) -> &'static str {
        match self {
            Self::NoDisease => "LOW RISK",
            Self::Disease => "ELEVATED RISK",
        }
    }

    #[must_use]
    pub fn guidance(self) -> &'static str {
        match self {
            Self::NoDisease => {
                "Continue regular health checkups and maintain a healthy lifestyle."
            }
            Self::Disease => "Please consult a cardiologist for comprehensive evaluation.",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDisease => write!(f, "NO_DISEASE"),
            Self::Disease => write!(f, "DISEASE"),
        }
    }
}

/// Threshold-based advisory signals. Comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdvisoryFlags {
    pub elevated_bp: bool,
    pub elevated_cholesterol: bool,
    pub advanced_age: bool,
    pub low_exercise_capacity: bool,
}

impl AdvisoryFlags {
    #[must_use]
    pub fn from_observation(obs: &ClinicalObservation) -> Self {
        Self {
            elevated_bp: obs.resting_bp > ELEVATED_BP_THRESHOLD,
            elevated_cholesterol: obs.cholesterol > ELEVATED_CHOLESTEROL_THRESHOLD,
            advanced_age: obs.age > ADVANCED_AGE_THRESHOLD,
            low_exercise_capacity: obs.max_heart_rate < LOW_EXERCISE_CAPACITY_THRESHOLD,
        }
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.elevated_bp
            || self.elevated_cholesterol
            || self.advanced_age
            || self.low_exercise_capacity
    }

    /// One advisory per raised flag, in flag order; the lifestyle defaults
    /// when nothing is raised.
    #[must_use]
    pub fn recommendations(&self) -> Vec<&'static str> {
        let advisories = [
            (self.elevated_bp, MONITOR_BLOOD_PRESSURE),
            (self.elevated_cholesterol, REDUCE_CHOLESTEROL),
            (self.advanced_age, CARDIAC_SCREENINGS),
            (self.low_exercise_capacity, DISCUSS_EXERCISE_CAPACITY),
        ];

        let raised: Vec<&'static str> = advisories
            .into_iter()
            .filter_map(|(on, text)| on.then_some(text))
            .collect();

        if raised.is_empty() {
            DEFAULT_RECOMMENDATIONS.to_vec()
        } else {
            raised
        }
    }
}

/// Traffic-light band for a headline metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricBand {
    Normal,
    Borderline,
    High,
}

/// Banded age, blood pressure and cholesterol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub age: MetricBand,
    pub blood_pressure: MetricBand,
    pub cholesterol: MetricBand,
}

impl KeyMetrics {
    #[must_use]
    pub fn from_observation(obs: &ClinicalObservation) -> Self {
        // Age never reaches the high band.
        let age = if obs.age > ADVANCED_AGE_THRESHOLD {
            MetricBand::Borderline
        } else {
            MetricBand::Normal
        };

        Self {
            age,
            blood_pressure: band(
                obs.resting_bp,
                BORDERLINE_BP_THRESHOLD,
                ELEVATED_BP_THRESHOLD,
            ),
            cholesterol: band(
                obs.cholesterol,
                BORDERLINE_CHOLESTEROL_THRESHOLD,
                ELEVATED_CHOLESTEROL_THRESHOLD,
            ),
        }
    }
}

fn band(value: u32, borderline: u32, high: u32) -> MetricBand {
    if value > high {
        MetricBand::High
    } else if value > borderline {
        MetricBand::Borderline
    } else {
        MetricBand::Normal
    }
}

/// Continuous inputs as percentages of their scale maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterProfile {
    pub age_pct: f64,
    pub blood_pressure_pct: f64,
    pub cholesterol_pct: f64,
    pub max_heart_rate_pct: f64,
    pub st_depression_pct: f64,
}

impl ParameterProfile {
    #[must_use]
    pub fn from_observation(obs: &ClinicalObservation) -> Self {
        Self {
            age_pct: percent_of(f64::from(obs.age), 100.0),
            blood_pressure_pct: percent_of(f64::from(obs.resting_bp), 200.0),
            cholesterol_pct: percent_of(f64::from(obs.cholesterol), 600.0),
            max_heart_rate_pct: percent_of(f64::from(obs.max_heart_rate), 220.0),
            st_depression_pct: percent_of(obs.st_depression, 6.0),
        }
    }
}

fn percent_of(value: f64, max: f64) -> f64 {
    value / max * 100.0
}

/// Outcome of one screening request. Displayed and discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub label: RiskLabel,
    pub flags: AdvisoryFlags,
    pub recommendations: Vec<String>,
    pub key_metrics: KeyMetrics,
    pub profile: ParameterProfile,
    pub assessed_at: chrono::DateTime<chrono::Utc>,
}

impl RiskAssessment {
    /// Combine a classifier label with the input-derived signals.
    #[must_use]
    pub fn new(label: RiskLabel, obs: &ClinicalObservation) -> Self {
        let flags = AdvisoryFlags::from_observation(obs);
        Self {
            label,
            recommendations: flags
                .recommendations()
                .into_iter()
                .map(str::to_string)
                .collect(),
            flags,
            key_metrics: KeyMetrics::from_observation(obs),
            profile: ParameterProfile::from_observation(obs),
            assessed_at: chrono::Utc::now(),
        }
    }
}
