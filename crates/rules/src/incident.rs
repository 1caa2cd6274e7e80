//! Incident descriptor and escalation action types.

use serde::{Deserialize, Serialize};

use vigil_core::{AlertType, SubjectStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Day,
    Night,
}

/// Input to the classifier, synthesized from upstream stage outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentDescriptor {
    pub alert_type: AlertType,
    pub subject_status: SubjectStatus,
    pub location_risk: LocationRisk,
    pub time_of_day: TimeOfDay,
}

/// Routing decision for a classified incident.
///
/// Variant order is severity order: `NotifyDashboard < NotifyResponder <
/// EscalateAuthorities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    NotifyDashboard,
    NotifyResponder,
    EscalateAuthorities,
}

impl EscalationAction {
    pub const ALL: [EscalationAction; 3] = [
        EscalationAction::NotifyDashboard,
        EscalationAction::NotifyResponder,
        EscalationAction::EscalateAuthorities,
    ];

    /// The more severe of two actions.
    pub fn merge(self, other: EscalationAction) -> EscalationAction {
        self.max(other)
    }

    /// Whether the action calls for a physical response.
    pub fn requires_dispatch(&self) -> bool {
        !matches!(self, EscalationAction::NotifyDashboard)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationAction::NotifyDashboard => "notify_dashboard",
            EscalationAction::NotifyResponder => "notify_responder",
            EscalationAction::EscalateAuthorities => "escalate_authorities",
        }
    }
}

impl std::fmt::Display for EscalationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_totally_ordered_by_severity() {
        assert!(EscalationAction::NotifyDashboard < EscalationAction::NotifyResponder);
        assert!(EscalationAction::NotifyResponder < EscalationAction::EscalateAuthorities);
        assert_eq!(
            EscalationAction::NotifyResponder.merge(EscalationAction::NotifyDashboard),
            EscalationAction::NotifyResponder
        );
        assert_eq!(
            EscalationAction::NotifyResponder.merge(EscalationAction::EscalateAuthorities),
            EscalationAction::EscalateAuthorities
        );
    }

    #[test]
    fn only_dashboard_skips_dispatch() {
        assert!(!EscalationAction::NotifyDashboard.requires_dispatch());
        assert!(EscalationAction::NotifyResponder.requires_dispatch());
        assert!(EscalationAction::EscalateAuthorities.requires_dispatch());
    }

    #[test]
    fn descriptor_serde_shape() {
        let d = IncidentDescriptor {
            alert_type: AlertType::SafetyZone,
            subject_status: SubjectStatus::Normal,
            location_risk: LocationRisk::High,
            time_of_day: TimeOfDay::Night,
        };
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json["alertType"], "safety_zone");
        assert_eq!(json["subjectStatus"], "normal");
        assert_eq!(json["locationRisk"], "high");
        assert_eq!(json["timeOfDay"], "night");
        assert_eq!(
            serde_json::to_value(EscalationAction::EscalateAuthorities).unwrap(),
            "escalate_authorities"
        );
    }
}
