//! Canonical, validated samples as seen by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// Subject identifier (wearer / monitored person).
pub type SubjectId = String;

/// Vital-sign channels the detector understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    HeartRate,
    OxygenLevel,
    Temperature,
    StressLevel,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::HeartRate,
        Metric::OxygenLevel,
        Metric::Temperature,
        Metric::StressLevel,
    ];

    /// Unit label used in messages.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::HeartRate => "bpm",
            Metric::OxygenLevel => "%",
            Metric::Temperature => "°C",
            Metric::StressLevel => "",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::HeartRate => write!(f, "heartRate"),
            Metric::OxygenLevel => write!(f, "oxygenLevel"),
            Metric::Temperature => write!(f, "temperature"),
            Metric::StressLevel => write!(f, "stressLevel"),
        }
    }
}

/// Categorical stress tiers. Stored in a [`Reading`] as the tier ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressTier {
    Low,
    Medium,
    High,
}

impl StressTier {
    pub fn ordinal(&self) -> f64 {
        match self {
            StressTier::Low => 0.0,
            StressTier::Medium => 1.0,
            StressTier::High => 2.0,
        }
    }

    /// Inverse of [`ordinal`](Self::ordinal). Only exact tier ordinals map back.
    pub fn from_ordinal(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(StressTier::Low)
        } else if value == 1.0 {
            Some(StressTier::Medium)
        } else if value == 2.0 {
            Some(StressTier::High)
        } else {
            None
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Some(StressTier::Low),
            "medium" => Some(StressTier::Medium),
            "high" => Some(StressTier::High),
            _ => None,
        }
    }
}

/// One validated vital-sign sample. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub subject_id: SubjectId,
    pub metric: Metric,
    pub value: f64,
    pub taken_at: DateTime<Utc>,
}

/// One validated position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub subject_id: SubjectId,
    pub position: Coordinates,
    pub taken_at: DateTime<Utc>,
}

/// Kind of incident an alert describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Panic,
    Fall,
    Heartbeat,
    SafetyZone,
}

impl AlertType {
    /// Alerts a device raises directly, as opposed to ones the pipeline derives.
    pub fn is_device_originated(&self) -> bool {
        matches!(self, AlertType::Panic | AlertType::Fall)
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Panic => write!(f, "panic"),
            AlertType::Fall => write!(f, "fall"),
            AlertType::Heartbeat => write!(f, "heartbeat"),
            AlertType::SafetyZone => write!(f, "safety_zone"),
        }
    }
}

/// Observed condition of the subject at incident time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    Normal,
    Unresponsive,
    Distress,
}

/// A device-originated alert (panic button, fall detector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlert {
    pub subject_id: SubjectId,
    pub alert_type: AlertType,
    pub status: Option<SubjectStatus>,
    pub position: Option<Coordinates>,
    pub raised_at: DateTime<Utc>,
}

/// A sample that passed the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    Vitals(Reading),
    Location(LocationFix),
    Alert(DeviceAlert),
}

impl Ingested {
    pub fn subject_id(&self) -> &str {
        match self {
            Ingested::Vitals(r) => &r.subject_id,
            Ingested::Location(l) => &l.subject_id,
            Ingested::Alert(a) => &a.subject_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Ingested::Vitals(r) => r.taken_at,
            Ingested::Location(l) => l.taken_at,
            Ingested::Alert(a) => a.raised_at,
        }
    }
}
