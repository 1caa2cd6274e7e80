//! Per-metric anomaly rule table.
//!
//! Heart rate and temperature are gated on the z-score of the new value
//! against the subject's own prior history; oxygen saturation uses absolute
//! clinical thresholds only; stress is categorical. The asymmetry between
//! metrics is intentional and preserved as-is.
//!
//! Every metric shares the cold-start policy: with fewer than
//! [`MIN_HISTORY`] prior samples nothing is flagged.

use serde::{Deserialize, Serialize};

use vigil_core::{Metric, StressTier};

use crate::history::{MetricHistory, MIN_HISTORY};
use crate::stats::z_score;

// ── Thresholds ────────────────────────────────────────────────────────

const HR_HIGH_WARN: f64 = 100.0;
const HR_HIGH_DANGER: f64 = 120.0;
const HR_LOW_WARN: f64 = 60.0;
const HR_LOW_DANGER: f64 = 50.0;
const HR_Z_GATE: f64 = 2.0;

const SPO2_WARN: f64 = 95.0;
const SPO2_DANGER: f64 = 90.0;

const TEMP_HIGH_WARN: f64 = 37.5;
const TEMP_HIGH_DANGER: f64 = 38.0;
const TEMP_LOW_WARN: f64 = 36.0;
const TEMP_LOW_DANGER: f64 = 35.5;
const TEMP_Z_GATE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Warning,
    Danger,
}

/// Outcome of evaluating one reading. Derived per reading, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    pub severity: Severity,
    pub message: String,
    /// z of the value against prior history; `None` during cold start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
}

impl AnomalyResult {
    fn normal(z: Option<f64>) -> Self {
        Self {
            is_anomaly: false,
            severity: Severity::None,
            message: String::new(),
            z_score: z,
        }
    }

    /// Cold-start result: not enough history to say anything.
    pub fn insufficient_history(have: usize) -> Self {
        Self {
            is_anomaly: false,
            severity: Severity::None,
            message: format!("insufficient history ({have}/{MIN_HISTORY} samples)"),
            z_score: None,
        }
    }

    fn flagged(severity: Severity, message: String, z: f64) -> Self {
        Self {
            is_anomaly: true,
            severity,
            message,
            z_score: Some(z),
        }
    }

    /// True when the detector had enough history to evaluate.
    pub fn evaluated(&self) -> bool {
        self.z_score.is_some()
    }
}

/// Stateless rule evaluator. Histories are owned by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct VitalAnomalyDetector;

impl VitalAnomalyDetector {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `value` against `history`, which must hold only *prior*
    /// samples. The caller appends `value` afterwards.
    pub fn observe(&self, metric: Metric, value: f64, history: &MetricHistory) -> AnomalyResult {
        if history.len() < MIN_HISTORY {
            return AnomalyResult::insufficient_history(history.len());
        }

        let z = z_score(value, history);

        match metric {
            Metric::HeartRate => heart_rate(value, z),
            Metric::OxygenLevel => oxygen(value, z),
            Metric::Temperature => temperature(value, z),
            Metric::StressLevel => stress(value, z),
        }
    }
}

fn heart_rate(value: f64, z: f64) -> AnomalyResult {
    if value > HR_HIGH_DANGER {
        AnomalyResult::flagged(
            Severity::Danger,
            format!("Heart rate critically high: {value:.0} bpm"),
            z,
        )
    } else if value > HR_HIGH_WARN && z > HR_Z_GATE {
        AnomalyResult::flagged(
            Severity::Warning,
            format!("Heart rate elevated: {value:.0} bpm (z={z:.1})"),
            z,
        )
    } else if value < HR_LOW_DANGER {
        AnomalyResult::flagged(
            Severity::Danger,
            format!("Heart rate critically low: {value:.0} bpm"),
            z,
        )
    } else if value < HR_LOW_WARN && z > HR_Z_GATE {
        AnomalyResult::flagged(
            Severity::Warning,
            format!("Heart rate low: {value:.0} bpm (z={z:.1})"),
            z,
        )
    } else {
        AnomalyResult::normal(Some(z))
    }
}

fn oxygen(value: f64, z: f64) -> AnomalyResult {
    if value < SPO2_DANGER {
        AnomalyResult::flagged(
            Severity::Danger,
            format!("Oxygen saturation critically low: {value:.0}%"),
            z,
        )
    } else if value < SPO2_WARN {
        AnomalyResult::flagged(
            Severity::Warning,
            format!("Oxygen saturation low: {value:.0}%"),
            z,
        )
    } else {
        AnomalyResult::normal(Some(z))
    }
}

fn temperature(value: f64, z: f64) -> AnomalyResult {
    if value > TEMP_HIGH_DANGER {
        AnomalyResult::flagged(
            Severity::Danger,
            format!("High fever: {value:.1}°C"),
            z,
        )
    } else if value > TEMP_HIGH_WARN && z > TEMP_Z_GATE {
        AnomalyResult::flagged(
            Severity::Warning,
            format!("Temperature elevated: {value:.1}°C (z={z:.1})"),
            z,
        )
    } else if value < TEMP_LOW_DANGER {
        AnomalyResult::flagged(
            Severity::Danger,
            format!("Hypothermia risk: {value:.1}°C"),
            z,
        )
    } else if value < TEMP_LOW_WARN && z > TEMP_Z_GATE {
        AnomalyResult::flagged(
            Severity::Warning,
            format!("Temperature low: {value:.1}°C (z={z:.1})"),
            z,
        )
    } else {
        AnomalyResult::normal(Some(z))
    }
}

fn stress(value: f64, z: f64) -> AnomalyResult {
    match StressTier::from_ordinal(value) {
        Some(StressTier::High) => AnomalyResult::flagged(
            Severity::Warning,
            "Stress level high".to_string(),
            z,
        ),
        _ => AnomalyResult::normal(Some(z)),
    }
}
