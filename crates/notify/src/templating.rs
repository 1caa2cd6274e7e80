//! Minijinja template rendering for incident notifications.
//!
//! Each escalation action has a subject and body template. Templates are
//! arbitrary strings, so a fresh [`minijinja::Environment`] is created per
//! render call.

use std::collections::HashMap;

use vigil_core::{AlertType, Coordinates, SubjectStatus};
use vigil_rules::{EscalationAction, LocationRisk, TimeOfDay};

use crate::traits::{Notification, NotifyError};

/// Context data available to notification templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext {
    pub incident: IncidentContext,
    /// Dispatched responders, nearest first.
    pub responders: Vec<ResponderContext>,
    /// Render time in ISO 8601 format.
    pub now: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IncidentContext {
    pub id: String,
    pub subject_id: String,
    pub alert_type: AlertType,
    pub subject_status: SubjectStatus,
    pub location_risk: LocationRisk,
    pub time_of_day: TimeOfDay,
    pub action: EscalationAction,
    pub location: Option<Coordinates>,
    /// Incident time in ISO 8601 format.
    pub at: String,
    /// Free-text cause, e.g. the anomaly message or zone name.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResponderContext {
    pub id: String,
    pub name: String,
    pub class: String,
    pub distance_km: f64,
    pub contact: String,
}

/// Subject and body template pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

impl MessageTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Built-in template for `action`.
    pub fn default_for(action: EscalationAction) -> Self {
        let subject = match action {
            EscalationAction::NotifyDashboard => {
                "[info] {{ incident.alert_type }} for {{ incident.subject_id }}"
            }
            EscalationAction::NotifyResponder => {
                "[responder] {{ incident.alert_type }} for {{ incident.subject_id }}"
            }
            EscalationAction::EscalateAuthorities => {
                "[URGENT] {{ incident.alert_type | upper }} for {{ incident.subject_id }}"
            }
        };
        Self::new(subject, DEFAULT_BODY)
    }
}

const DEFAULT_BODY: &str = "\
Incident {{ incident.id }} at {{ incident.at }}
Subject: {{ incident.subject_id }} ({{ incident.subject_status }})
Alert: {{ incident.alert_type }}, location risk {{ incident.location_risk }}, {{ incident.time_of_day }}
{% if incident.detail %}Detail: {{ incident.detail }}
{% endif %}{% if incident.location %}Location: {{ incident.location.lat | round(5) }}, {{ incident.location.lng | round(5) }}
{% endif %}{% for r in responders %}Responder: {{ r.name }} ({{ r.class }}) {{ r.distance_km | round(2) }} km
{% endfor %}Action: {{ incident.action }}";

/// Renders notification templates using minijinja.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<EscalationAction, MessageTemplate>,
}

impl TemplateRenderer {
    /// Renderer with the built-in template for every action.
    pub fn new() -> Self {
        let templates = EscalationAction::ALL
            .iter()
            .map(|a| (*a, MessageTemplate::default_for(*a)))
            .collect();
        Self { templates }
    }

    /// Replace the template for one action after checking its syntax.
    pub fn set_template(
        &mut self,
        action: EscalationAction,
        template: MessageTemplate,
    ) -> Result<(), NotifyError> {
        self.validate(&template.subject)?;
        self.validate(&template.body)?;
        self.templates.insert(action, template);
        Ok(())
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &TemplateContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }

    /// Render the action's template pair into a [`Notification`].
    pub fn render_notification(&self, ctx: &TemplateContext) -> Result<Notification, NotifyError> {
        let action = ctx.incident.action;
        let fallback;
        let template = match self.templates.get(&action) {
            Some(t) => t,
            None => {
                fallback = MessageTemplate::default_for(action);
                &fallback
            }
        };

        let mut metadata = HashMap::from([
            ("alert_type".to_string(), ctx.incident.alert_type.to_string()),
            ("action".to_string(), action.to_string()),
        ]);
        if !ctx.responders.is_empty() {
            let ids: Vec<&str> = ctx.responders.iter().map(|r| r.id.as_str()).collect();
            metadata.insert("responders".to_string(), ids.join(","));
        }

        Ok(Notification {
            incident_id: ctx.incident.id.clone(),
            subject_id: ctx.incident.subject_id.clone(),
            action,
            subject: self.render(&template.subject, ctx)?,
            body: self.render(&template.body, ctx)?,
            metadata,
        })
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}
