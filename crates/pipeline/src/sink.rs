//! Output side of the pipeline.
//!
//! Stages never reach for a global socket or logger to publish results;
//! every event goes to an [`EventSink`] handed in by the host.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;

use vigil_core::RegistrySource;
use vigil_notify::{
    Dispatcher, IncidentContext, ResponderContext, TemplateContext, TemplateRenderer,
};
use vigil_rules::{AuditLog, AuditPhase, LogLevel};

use crate::events::PipelineEvent;
use crate::incident::Incident;

#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: PipelineEvent);
}

// ── Channel ─────────────────────────────────────────────────────────

/// Forwards events into a bounded tokio channel. A closed receiver drops
/// events with a warning.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait::async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: PipelineEvent) {
        let kind = event.kind();
        if self.tx.send(event).await.is_err() {
            warn!(event = kind, "event receiver closed, dropping event");
        }
    }
}

// ── Fan-out ─────────────────────────────────────────────────────────

/// Emits every event to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait::async_trait]
impl EventSink for FanoutSink {
    async fn emit(&self, event: PipelineEvent) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.emit(event.clone()).await;
        }
        last.emit(event).await;
    }
}

// ── Notification ────────────────────────────────────────────────────

/// Renders incidents into notifications and hands them to a [`Dispatcher`].
///
/// Other events are ignored. Delivery outcomes are written to the audit log;
/// the classification itself was already recorded by the pipeline.
pub struct NotifyingSink {
    dispatcher: Dispatcher,
    renderer: TemplateRenderer,
    registry: Arc<dyn RegistrySource>,
    audit: AuditLog,
}

impl NotifyingSink {
    pub fn new(
        dispatcher: Dispatcher,
        renderer: TemplateRenderer,
        registry: Arc<dyn RegistrySource>,
        audit: AuditLog,
    ) -> Self {
        Self {
            dispatcher,
            renderer,
            registry,
            audit,
        }
    }

    fn context(&self, incident: &Incident) -> TemplateContext {
        let registry = self.registry.responders();
        let responders = incident
            .dispatches
            .iter()
            .map(|d| {
                let known = registry.iter().find(|r| r.id == d.responder_id);
                ResponderContext {
                    id: d.responder_id.clone(),
                    name: known.map(|r| r.name.clone()).unwrap_or_else(|| d.responder_id.clone()),
                    class: known.map(|r| r.class.to_string()).unwrap_or_default(),
                    distance_km: d.distance_km,
                    contact: known.map(|r| r.contact.clone()).unwrap_or_default(),
                }
            })
            .collect();

        TemplateContext {
            incident: IncidentContext {
                id: incident.id.to_string(),
                subject_id: incident.subject_id.clone(),
                alert_type: incident.descriptor.alert_type,
                subject_status: incident.descriptor.subject_status,
                location_risk: incident.descriptor.location_risk,
                time_of_day: incident.descriptor.time_of_day,
                action: incident.action,
                location: incident.location,
                at: incident.at.to_rfc3339(),
                detail: incident.detail.clone(),
            },
            responders,
            now: Utc::now().to_rfc3339(),
        }
    }

    async fn notify(&self, incident: &Incident) {
        let notification = match self.renderer.render_notification(&self.context(incident)) {
            Ok(n) => n,
            Err(e) => {
                warn!(incident_id = %incident.id, error = %e, "failed to render notification");
                self.audit.log(
                    &incident.subject_id,
                    LogLevel::Error,
                    AuditPhase::NotifyError,
                    format!("incident {}: {e}", incident.id),
                );
                return;
            }
        };

        for result in self.dispatcher.dispatch(&notification).await {
            let details = serde_json::to_value(&result).ok();
            if result.success {
                self.audit.log_with_details(
                    &incident.subject_id,
                    LogLevel::Info,
                    AuditPhase::Notification,
                    format!("incident {} delivered via {}", incident.id, result.channel),
                    details,
                );
            } else {
                self.audit.log_with_details(
                    &incident.subject_id,
                    LogLevel::Error,
                    AuditPhase::NotifyError,
                    format!(
                        "incident {} not delivered via {}: {}",
                        incident.id,
                        result.channel,
                        result.error.as_deref().unwrap_or("unknown error")
                    ),
                    details,
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl EventSink for NotifyingSink {
    async fn emit(&self, event: PipelineEvent) {
        if let PipelineEvent::Incident(incident) = &event {
            self.notify(incident).await;
        }
    }
}
