//! Output events of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{Metric, SubjectId};
use vigil_geofence::ZoneEvent;
use vigil_vitals::{AnomalyResult, RiskLevel};

use crate::incident::Incident;

/// Everything the pipeline reports to its sink, one JSON object per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Anomaly(AnomalyEvent),
    Risk(RiskEvent),
    Zone(ZoneEvent),
    Incident(Incident),
    EmergencyCleared(EmergencyCleared),
    Rejected(Rejected),
}

impl PipelineEvent {
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::Anomaly(e) => Some(&e.subject_id),
            PipelineEvent::Risk(e) => Some(&e.subject_id),
            PipelineEvent::Zone(e) => Some(&e.subject_id),
            PipelineEvent::Incident(e) => Some(&e.subject_id),
            PipelineEvent::EmergencyCleared(e) => Some(&e.subject_id),
            PipelineEvent::Rejected(e) => e.subject_id.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::Anomaly(_) => "anomaly",
            PipelineEvent::Risk(_) => "risk",
            PipelineEvent::Zone(_) => "zone",
            PipelineEvent::Incident(_) => "incident",
            PipelineEvent::EmergencyCleared(_) => "emergency_cleared",
            PipelineEvent::Rejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyEvent {
    pub subject_id: SubjectId,
    pub metric: Metric,
    pub value: f64,
    pub result: AnomalyResult,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEvent {
    pub subject_id: SubjectId,
    pub score: u8,
    pub level: RiskLevel,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyCleared {
    pub subject_id: SubjectId,
    pub at: DateTime<Utc>,
}

/// A sample that failed validation and never reached any stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejected {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    pub reason: String,
    /// Input line number, when read from a JSON-lines stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_kind() {
        let event = PipelineEvent::EmergencyCleared(EmergencyCleared {
            subject_id: "s1".into(),
            at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "emergency_cleared");
        assert_eq!(json["subjectId"], "s1");
        assert_eq!(event.kind(), "emergency_cleared");
    }

    #[test]
    fn rejected_without_subject_omits_it() {
        let event = PipelineEvent::Rejected(Rejected {
            subject_id: None,
            reason: "invalid sample".into(),
            line: Some(3),
            at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("subjectId").is_none());
        assert_eq!(json["line"], 3);
        assert_eq!(event.subject_id(), None);
    }
}
