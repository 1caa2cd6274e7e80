//! Incident synthesis: turning stage outputs into a classifier input.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_core::config::ScheduleConfig;
use vigil_core::{AlertType, Coordinates, SubjectId, SubjectStatus};
use vigil_geofence::ZoneMembershipState;
use vigil_notify::DispatchRecord;
use vigil_rules::{EscalationAction, IncidentDescriptor, LocationRisk, TimeOfDay};
use vigil_vitals::Severity;

/// Risk score at or above which a subject without an explicit status is
/// considered in distress.
pub const DISTRESS_RISK_SCORE: u8 = 3;

/// A classified incident and the responders picked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: Uuid,
    pub subject_id: SubjectId,
    pub descriptor: IncidentDescriptor,
    pub action: EscalationAction,
    /// Name of the classifier rule that produced `action`.
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    pub dispatches: Vec<DispatchRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

/// What triggered an incident, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentTrigger {
    pub alert_type: AlertType,
    /// Status reported by the device, if any.
    pub reported_status: Option<SubjectStatus>,
    /// Severity of the anomaly behind this trigger, if any.
    pub anomaly_severity: Option<Severity>,
    /// Position carried by the triggering sample itself.
    pub position: Option<Coordinates>,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

/// Reported status wins; otherwise distress on a danger anomaly or a high
/// risk score.
pub fn subject_status(
    reported: Option<SubjectStatus>,
    anomaly_severity: Option<Severity>,
    risk_score: Option<u8>,
) -> SubjectStatus {
    if let Some(status) = reported {
        return status;
    }
    let danger = anomaly_severity == Some(Severity::Danger);
    let risky = risk_score.is_some_and(|s| s >= DISTRESS_RISK_SCORE);
    if danger || risky {
        SubjectStatus::Distress
    } else {
        SubjectStatus::Normal
    }
}

/// Trusted zones dampen everything; a latched emergency is high risk;
/// merely being outside is medium.
pub fn location_risk(membership: &ZoneMembershipState) -> LocationRisk {
    if membership.inside_trusted_zone {
        LocationRisk::Low
    } else if membership.emergency_active {
        LocationRisk::High
    } else if !membership.inside_active_zone {
        LocationRisk::Medium
    } else {
        LocationRisk::Low
    }
}

pub fn time_of_day(at: DateTime<Utc>, schedule: &ScheduleConfig) -> TimeOfDay {
    if schedule.is_night_hour(at.hour()) {
        TimeOfDay::Night
    } else {
        TimeOfDay::Day
    }
}
