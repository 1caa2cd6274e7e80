//! Escalation decision table.
//!
//! Rules are evaluated top to bottom and the first match wins:
//!
//! | # | condition                                   | action                 |
//! |---|---------------------------------------------|------------------------|
//! | 1 | panic, status not normal                    | `escalate_authorities` |
//! | 2 | fall, status unresponsive                   | `notify_responder`     |
//! | 3 | location risk high, at night                | `notify_responder`     |
//! | 4 | anything else                               | `notify_dashboard`     |
//!
//! Environmental risk (rule 3) is the weakest signal and sits below both
//! explicit device alerts.

use vigil_core::{AlertType, SubjectStatus};

use crate::incident::{EscalationAction, IncidentDescriptor, LocationRisk, TimeOfDay};

/// One row of the decision table.
struct ClassifierRule {
    name: &'static str,
    matches: fn(&IncidentDescriptor) -> bool,
    action: EscalationAction,
}

const RULES: [ClassifierRule; 3] = [
    ClassifierRule {
        name: "panic_with_distress",
        matches: |d| d.alert_type == AlertType::Panic && d.subject_status != SubjectStatus::Normal,
        action: EscalationAction::EscalateAuthorities,
    },
    ClassifierRule {
        name: "fall_unresponsive",
        matches: |d| {
            d.alert_type == AlertType::Fall && d.subject_status == SubjectStatus::Unresponsive
        },
        action: EscalationAction::NotifyResponder,
    },
    ClassifierRule {
        name: "high_risk_at_night",
        matches: |d| d.location_risk == LocationRisk::High && d.time_of_day == TimeOfDay::Night,
        action: EscalationAction::NotifyResponder,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertClassifier;

impl AlertClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, descriptor: &IncidentDescriptor) -> EscalationAction {
        self.classify_explained(descriptor).0
    }

    /// Like [`classify`](Self::classify), also naming the rule that matched
    /// (`"default"` when none did).
    pub fn classify_explained(&self, descriptor: &IncidentDescriptor) -> (EscalationAction, &'static str) {
        RULES
            .iter()
            .find(|rule| (rule.matches)(descriptor))
            .map(|rule| (rule.action, rule.name))
            .unwrap_or((EscalationAction::NotifyDashboard, "default"))
    }
}
