//! Vital-sign analysis: rolling per-metric history, statistical anomaly
//! detection against fixed clinical thresholds, and composite risk scoring.
//!
//! Sub-modules:
//! - [`history`]: bounded per-(subject, metric) value history
//! - [`stats`]: rolling mean / population standard deviation
//! - [`detector`]: per-metric anomaly rule table
//! - [`risk`]: additive, clamped risk score

pub mod detector;
pub mod history;
pub mod risk;
pub mod stats;

pub use detector::{AnomalyResult, Severity, VitalAnomalyDetector};
pub use history::{MetricHistory, VitalHistories, HISTORY_CAPACITY, MIN_HISTORY};
pub use risk::{RiskLevel, RiskScorer, VitalsSnapshot, MAX_RISK_SCORE};
