//! Stage composition for one sample.
//!
//! ```text
//! Ingested ─┬─ vitals ───▶ VitalAnomalyDetector ─┬─▶ anomaly / risk events
//!           │              RiskScorer ───────────┘        │ heartRate anomaly
//!           ├─ location ─▶ GeofenceTracker ──────▶ zone events
//!           │                                             │ exit / emergency
//!           └─ alert ──────────────────────────────┐      │
//!                                                  ▼      ▼
//!                                   IncidentDescriptor ─▶ AlertClassifier
//!                                                  │
//!                              requires dispatch? ─▶ ResponderDispatcher
//! ```
//!
//! [`Pipeline`] holds only shared, read-only collaborators. All mutable
//! per-subject state lives in the [`SubjectState`] passed to [`Pipeline::handle`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use vigil_core::config::{DispatchConfig, GeofenceConfig, ScheduleConfig};
use vigil_core::{
    AlertType, Config, Coordinates, DeviceAlert, Ingested, LocationFix, Metric, Reading,
    RegistrySource, SafeZone, VigilError,
};
use vigil_geofence::{ZoneEvent, ZoneEventKind};
use vigil_notify::{eligible_responders, ResponderDispatcher};
use vigil_rules::{AlertClassifier, AuditLog, AuditPhase, IncidentDescriptor, LogLevel};
use vigil_vitals::{RiskLevel, RiskScorer, Severity, VitalAnomalyDetector};

use crate::events::{AnomalyEvent, EmergencyCleared, PipelineEvent, Rejected, RiskEvent};
use crate::incident::{location_risk, subject_status, time_of_day, Incident, IncidentTrigger};
use crate::state::SubjectState;

/// Tunables the stages read on every sample.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub geofence: GeofenceConfig,
    pub dispatch: DispatchConfig,
    pub schedule: ScheduleConfig,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            geofence: config.geofence.clone(),
            dispatch: config.dispatch.clone(),
            schedule: config.schedule.clone(),
        }
    }
}

pub struct Pipeline {
    detector: VitalAnomalyDetector,
    scorer: RiskScorer,
    classifier: AlertClassifier,
    dispatcher: ResponderDispatcher,
    registry: Arc<dyn RegistrySource>,
    audit: AuditLog,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, registry: Arc<dyn RegistrySource>, audit: AuditLog) -> Self {
        Self {
            detector: VitalAnomalyDetector::new(),
            scorer: RiskScorer::new(),
            classifier: AlertClassifier::new(),
            dispatcher: ResponderDispatcher::new(),
            registry,
            audit,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Fresh state for a subject seen for the first time.
    pub fn new_subject(&self, subject_id: &str) -> SubjectState {
        SubjectState::new(subject_id, self.settings.geofence.emergency_after_secs)
    }

    /// Run one validated sample through every stage it concerns.
    ///
    /// `state` must belong to the sample's subject and samples must arrive in
    /// order; both the rolling statistics and the emergency latch depend on it.
    pub fn handle(&self, state: &mut SubjectState, sample: Ingested) -> Vec<PipelineEvent> {
        debug_assert_eq!(state.subject_id, sample.subject_id());
        match sample {
            Ingested::Vitals(reading) => self.handle_vitals(state, reading),
            Ingested::Location(fix) => self.handle_location(state, fix),
            Ingested::Alert(alert) => self.handle_alert(state, alert),
        }
    }

    /// Human acknowledgment of a latched geofence emergency.
    ///
    /// Emits `emergency_cleared` only when a latch was actually set.
    pub fn clear_emergency(&self, state: &mut SubjectState, at: DateTime<Utc>) -> Vec<PipelineEvent> {
        if !state.geofence.clear_emergency() {
            debug!(subject_id = %state.subject_id, "clear requested with no emergency latched");
            return Vec::new();
        }
        self.audit.log(
            &state.subject_id,
            LogLevel::Info,
            AuditPhase::Acknowledge,
            "emergency cleared by acknowledgment",
        );
        vec![PipelineEvent::EmergencyCleared(EmergencyCleared {
            subject_id: state.subject_id.clone(),
            at,
        })]
    }

    /// Report a sample that failed validation at the ingestion boundary.
    pub fn reject(&self, subject_id: Option<&str>, error: &VigilError, line: Option<usize>) -> PipelineEvent {
        warn!(subject_id = ?subject_id, line = ?line, error = %error, "rejected sample");
        if let Some(id) = subject_id {
            self.audit.log(id, LogLevel::Warning, AuditPhase::Ingestion, error.to_string());
        }
        PipelineEvent::Rejected(Rejected {
            subject_id: subject_id.map(str::to_string),
            reason: error.to_string(),
            line,
            at: Utc::now(),
        })
    }

    // ── Vitals ────────────────────────────────────────────────────

    fn handle_vitals(&self, state: &mut SubjectState, reading: Reading) -> Vec<PipelineEvent> {
        let mut events = Vec::new();

        let result = state.histories.observe_and_record(&self.detector, &reading);
        state.vitals.update(&reading);

        let score = self.scorer.score_snapshot(&state.vitals, state.in_risk_zone());
        state.last_risk_score = Some(score);
        self.audit.log_with_details(
            &state.subject_id,
            LogLevel::Debug,
            AuditPhase::Risk,
            format!("risk score {score}"),
            Some(serde_json::json!({ "metric": reading.metric, "value": reading.value })),
        );

        if result.is_anomaly {
            let level = if result.severity == Severity::Danger {
                LogLevel::Error
            } else {
                LogLevel::Warning
            };
            self.audit.log_with_details(
                &state.subject_id,
                level,
                AuditPhase::Anomaly,
                result.message.clone(),
                Some(serde_json::json!({ "metric": reading.metric, "zScore": result.z_score })),
            );
            events.push(PipelineEvent::Anomaly(AnomalyEvent {
                subject_id: state.subject_id.clone(),
                metric: reading.metric,
                value: reading.value,
                result: result.clone(),
                at: reading.taken_at,
            }));
        }

        events.push(PipelineEvent::Risk(RiskEvent {
            subject_id: state.subject_id.clone(),
            score,
            level: RiskLevel::from_score(score),
            at: reading.taken_at,
        }));

        if result.is_anomaly && reading.metric == Metric::HeartRate {
            let trigger = IncidentTrigger {
                alert_type: AlertType::Heartbeat,
                reported_status: None,
                anomaly_severity: Some(result.severity),
                position: None,
                detail: Some(result.message),
                at: reading.taken_at,
            };
            events.push(PipelineEvent::Incident(self.raise(state, trigger)));
        }

        events
    }

    // ── Location ──────────────────────────────────────────────────

    fn handle_location(&self, state: &mut SubjectState, fix: LocationFix) -> Vec<PipelineEvent> {
        let zones = self.current_zones(&state.subject_id);
        state.last_location = Some(fix.position);

        let zone_events = state.geofence.observe_at(&fix.position, &zones, fix.taken_at);
        self.escalate_zone_events(state, zone_events, Some(fix.position), fix.taken_at)
    }

    /// Let time pass for a subject without a new fix.
    ///
    /// A subject that left its zones and then went quiet still reaches the
    /// emergency latch; the incident is placed at the last known location.
    pub fn tick(&self, state: &mut SubjectState, now: DateTime<Utc>) -> Vec<PipelineEvent> {
        let zone_events: Vec<ZoneEvent> = state.geofence.advance_to(now).into_iter().collect();
        self.escalate_zone_events(state, zone_events, state.last_location, now)
    }

    /// Audit zone events and raise a `safety_zone` incident for every exit
    /// and emergency.
    fn escalate_zone_events(
        &self,
        state: &SubjectState,
        zone_events: Vec<ZoneEvent>,
        position: Option<Coordinates>,
        at: DateTime<Utc>,
    ) -> Vec<PipelineEvent> {
        let mut events = Vec::with_capacity(zone_events.len());
        for zone_event in zone_events {
            self.audit_zone_event(&zone_event);
            let escalates = matches!(zone_event.kind, ZoneEventKind::ZoneExit | ZoneEventKind::Emergency);
            let detail = describe_zone_event(&zone_event);
            events.push(PipelineEvent::Zone(zone_event));

            if escalates {
                let trigger = IncidentTrigger {
                    alert_type: AlertType::SafetyZone,
                    reported_status: None,
                    anomaly_severity: None,
                    position,
                    detail: Some(detail),
                    at,
                };
                events.push(PipelineEvent::Incident(self.raise(state, trigger)));
            }
        }
        events
    }

    /// Zone snapshot, or none at all when the registry is unavailable:
    /// the subject is then treated as outside.
    fn current_zones(&self, subject_id: &str) -> Arc<[SafeZone]> {
        match self.registry.zones() {
            Ok(zones) => zones,
            Err(e) => {
                warn!(subject_id, error = %e, "zone registry unavailable, treating subject as outside");
                Vec::<SafeZone>::new().into()
            }
        }
    }

    fn audit_zone_event(&self, event: &ZoneEvent) {
        let level = match event.kind {
            ZoneEventKind::ZoneEnter => LogLevel::Info,
            ZoneEventKind::ZoneExit => LogLevel::Warning,
            ZoneEventKind::Emergency => LogLevel::Error,
        };
        self.audit.log(&event.subject_id, level, AuditPhase::Zone, describe_zone_event(event));
    }

    // ── Device alerts ─────────────────────────────────────────────

    fn handle_alert(&self, state: &mut SubjectState, alert: DeviceAlert) -> Vec<PipelineEvent> {
        if let Some(position) = alert.position {
            state.last_location = Some(position);
        }
        let trigger = IncidentTrigger {
            alert_type: alert.alert_type,
            reported_status: alert.status,
            anomaly_severity: None,
            position: alert.position,
            detail: None,
            at: alert.raised_at,
        };
        vec![PipelineEvent::Incident(self.raise(state, trigger))]
    }

    // ── Classification and dispatch ───────────────────────────────

    /// Classify a trigger and pick responders.
    ///
    /// The decision is written to the audit log before anything is handed to
    /// a notifier, so a failed delivery never loses it.
    fn raise(&self, state: &SubjectState, trigger: IncidentTrigger) -> Incident {
        let descriptor = IncidentDescriptor {
            alert_type: trigger.alert_type,
            subject_status: subject_status(
                trigger.reported_status,
                trigger.anomaly_severity,
                state.last_risk_score,
            ),
            location_risk: location_risk(state.geofence.membership()),
            time_of_day: time_of_day(trigger.at, &self.settings.schedule),
        };
        let (action, rule) = self.classifier.classify_explained(&descriptor);
        let id = Uuid::new_v4();

        self.audit.log_with_details(
            &state.subject_id,
            if action.requires_dispatch() { LogLevel::Warning } else { LogLevel::Info },
            AuditPhase::Classification,
            format!("{} -> {}", descriptor.alert_type, action),
            serde_json::to_value(&descriptor)
                .ok()
                .map(|d| serde_json::json!({ "incidentId": id, "rule": rule, "descriptor": d })),
        );
        info!(
            subject_id = %state.subject_id,
            incident_id = %id,
            alert_type = %descriptor.alert_type,
            %action,
            rule,
            "incident classified"
        );

        let location = trigger.position.or(state.last_location);
        let mut dispatches = Vec::new();

        if action.requires_dispatch() {
            match location {
                Some(at) => {
                    let candidates = eligible_responders(action, &self.registry.responders());
                    dispatches = self.dispatcher.dispatch_at(
                        &at,
                        &candidates,
                        self.settings.dispatch.max_responders,
                        Utc::now(),
                    );
                    let ids: Vec<&str> = dispatches.iter().map(|d| d.responder_id.as_str()).collect();
                    let (level, message) = if dispatches.is_empty() {
                        (LogLevel::Warning, format!("no eligible responders for {action}"))
                    } else {
                        (LogLevel::Info, format!("dispatched {}", ids.join(", ")))
                    };
                    self.audit.log_with_details(
                        &state.subject_id,
                        level,
                        AuditPhase::Dispatch,
                        message,
                        Some(serde_json::json!({ "incidentId": id, "responders": ids })),
                    );
                }
                None => {
                    warn!(subject_id = %state.subject_id, incident_id = %id, "no known location, dispatch skipped");
                    self.audit.log(
                        &state.subject_id,
                        LogLevel::Warning,
                        AuditPhase::Dispatch,
                        "no known location, dispatch skipped",
                    );
                }
            }
        }

        Incident {
            id,
            subject_id: state.subject_id.clone(),
            descriptor,
            action,
            rule: rule.to_string(),
            location,
            dispatches,
            detail: trigger.detail,
            at: trigger.at,
        }
    }
}

fn describe_zone_event(event: &ZoneEvent) -> String {
    let zone = event.zone_name.as_deref().unwrap_or("unknown zone");
    match event.kind {
        ZoneEventKind::ZoneEnter => format!("entered {zone}"),
        ZoneEventKind::ZoneExit => format!("left {zone}"),
        ZoneEventKind::Emergency => {
            format!("outside every safe zone for {}s (last: {zone})", event.outside_seconds)
        }
    }
}
