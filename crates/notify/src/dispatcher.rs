//! Routes notifications to configured channels.
//!
//! Each escalation action has its own channel list; actions without one fall
//! back to the default channels. Individual channel failures don't block
//! other channels.

use std::collections::HashMap;

use vigil_rules::EscalationAction;

use crate::traits::{DeliveryResult, Notification, Notifier, NotifyError};

/// Dispatches notifications to multiple channels, organized per action.
pub struct Dispatcher {
    action_channels: HashMap<EscalationAction, Vec<Box<dyn Notifier>>>,
    /// Fallback channels used when an action has no channels of its own.
    default_channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(action_channels: HashMap<EscalationAction, Vec<Box<dyn Notifier>>>) -> Self {
        Self {
            action_channels,
            default_channels: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Create a simple dispatcher with channels shared across all actions.
    pub fn with_defaults(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            action_channels: HashMap::new(),
            default_channels: channels,
        }
    }

    /// Replace all channels for one action.
    pub fn set_action_channels(&mut self, action: EscalationAction, channels: Vec<Box<dyn Notifier>>) {
        self.action_channels.insert(action, channels);
    }

    /// Drop an action's own channels so it falls back to the defaults.
    pub fn remove_action(&mut self, action: EscalationAction) {
        self.action_channels.remove(&action);
    }

    pub fn set_default_channels(&mut self, channels: Vec<Box<dyn Notifier>>) {
        self.default_channels = channels;
    }

    fn channels_for(&self, action: EscalationAction) -> &[Box<dyn Notifier>] {
        self.action_channels
            .get(&action)
            .unwrap_or(&self.default_channels)
    }

    /// Deliver `notification` to every channel for its action.
    ///
    /// Returns one result per channel.
    pub async fn dispatch(&self, notification: &Notification) -> Vec<DeliveryResult> {
        let action = notification.action;
        let channels = self.channels_for(action);

        if channels.is_empty() {
            tracing::debug!(%action, "No notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(channels.len());

        for channel in channels {
            let start = std::time::Instant::now();
            let result = channel.send(notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        %action,
                        incident_id = %notification.incident_id,
                        channel = channel.channel_name(),
                        duration_ms,
                        "Notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        %action,
                        incident_id = %notification.incident_id,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "Notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DeliveryResult {
                channel: channel.channel_name().to_string(),
                incident_id: notification.incident_id.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Send a test notification to one of an action's channels by index.
    pub async fn test_notify(
        &self,
        action: EscalationAction,
        channel_index: usize,
    ) -> Result<(), NotifyError> {
        let channels = self.channels_for(action);

        let channel = channels
            .get(channel_index)
            .ok_or_else(|| NotifyError::Config(format!("Channel index {channel_index} out of range for {action}")))?;

        channel.test().await
    }
}
