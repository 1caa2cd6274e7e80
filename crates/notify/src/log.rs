//! Notifier that writes notifications to the tracing log.
//!
//! The default channel for the worker binary: every decision ends up in the
//! process log even when no external delivery is configured.

use crate::traits::{Notification, Notifier, NotifyError};
use vigil_rules::EscalationAction;

#[derive(Debug, Clone)]
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::named("log")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification.action {
            EscalationAction::NotifyDashboard => tracing::info!(
                channel = %self.name,
                incident_id = %notification.incident_id,
                subject_id = %notification.subject_id,
                action = %notification.action,
                subject = %notification.subject,
                "{}",
                notification.body
            ),
            EscalationAction::NotifyResponder | EscalationAction::EscalateAuthorities => {
                tracing::warn!(
                    channel = %self.name,
                    incident_id = %notification.incident_id,
                    subject_id = %notification.subject_id,
                    action = %notification.action,
                    subject = %notification.subject,
                    "{}",
                    notification.body
                )
            }
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}
