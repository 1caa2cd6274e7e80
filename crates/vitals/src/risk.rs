//! Composite risk score.
//!
//! Additive weights over the current vitals plus a location flag, clamped
//! to [`MAX_RISK_SCORE`]. Pure: every call site gets the same answer for
//! the same inputs.

use serde::{Deserialize, Serialize};

use vigil_core::{Metric, Reading};

/// Ceiling of the composite score.
pub const MAX_RISK_SCORE: u8 = 5;

/// Heart rate outside this band (inclusive bounds are safe) adds weight.
const HR_SAFE_BAND: (f64, f64) = (40.0, 150.0);
const HR_WEIGHT: u8 = 2;

const SPO2_CRITICAL: f64 = 85.0;
const SPO2_WEIGHT: u8 = 2;

const FEVER: f64 = 38.5;
const FEVER_WEIGHT: u8 = 1;

const LOCATION_WEIGHT: u8 = 1;

/// Coarse bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Elevated,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=1 => RiskLevel::Low,
            2..=3 => RiskLevel::Elevated,
            _ => RiskLevel::Critical,
        }
    }
}

/// Latest known value of each vital for one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSnapshot {
    pub heart_rate: Option<f64>,
    pub oxygen_level: Option<f64>,
    pub temperature: Option<f64>,
    pub stress_level: Option<f64>,
}

impl VitalsSnapshot {
    pub fn update(&mut self, reading: &Reading) {
        let slot = match reading.metric {
            Metric::HeartRate => &mut self.heart_rate,
            Metric::OxygenLevel => &mut self.oxygen_level,
            Metric::Temperature => &mut self.temperature,
            Metric::StressLevel => &mut self.stress_level,
        };
        *slot = Some(reading.value);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a full set of vitals. Result is always in `0..=5`.
    pub fn score(
        &self,
        heart_rate: f64,
        oxygen_level: f64,
        temperature: f64,
        location_risk_zone: bool,
    ) -> u8 {
        self.score_snapshot(
            &VitalsSnapshot {
                heart_rate: Some(heart_rate),
                oxygen_level: Some(oxygen_level),
                temperature: Some(temperature),
                stress_level: None,
            },
            location_risk_zone,
        )
    }

    /// Score whatever is known; missing vitals contribute nothing.
    pub fn score_snapshot(&self, vitals: &VitalsSnapshot, location_risk_zone: bool) -> u8 {
        let mut total: u8 = 0;

        if let Some(hr) = vitals.heart_rate {
            if hr < HR_SAFE_BAND.0 || hr > HR_SAFE_BAND.1 {
                total += HR_WEIGHT;
            }
        }
        if let Some(o2) = vitals.oxygen_level {
            if o2 < SPO2_CRITICAL {
                total += SPO2_WEIGHT;
            }
        }
        if let Some(t) = vitals.temperature {
            if t > FEVER {
                total += FEVER_WEIGHT;
            }
        }
        if location_risk_zone {
            total += LOCATION_WEIGHT;
        }

        total.min(MAX_RISK_SCORE)
    }
}
