//! Notifier trait definition and shared error types.

use std::collections::HashMap;

use vigil_rules::EscalationAction;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel '{0}' is closed")]
    ChannelClosed(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    pub incident_id: String,
    pub subject_id: String,
    pub action: EscalationAction,
    /// The rendered subject/title.
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    /// Additional metadata (alert type, responder ids).
    pub metadata: HashMap<String, String>,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Test connectivity with a sample notification.
    async fn test(&self) -> Result<(), NotifyError> {
        let test_notification = Notification {
            incident_id: "test-incident".to_string(),
            subject_id: "test-subject".to_string(),
            action: EscalationAction::NotifyDashboard,
            subject: "[TEST] Incident pipeline test".to_string(),
            body: "This is a test notification from the vigil incident pipeline.".to_string(),
            metadata: HashMap::from([("event".to_string(), "test".to_string())]),
        };
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "log", "channel").
    fn channel_name(&self) -> &str;
}

/// Result of delivering one notification to one channel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeliveryResult {
    pub channel: String,
    pub incident_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
