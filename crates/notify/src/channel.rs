//! Notifier that forwards notifications into a tokio mpsc channel.
//!
//! For embedding: the host application owns the receiver and performs the
//! actual delivery (SMS, push, broadcast).

use tokio::sync::mpsc;

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    name: String,
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<Notification>) -> Self {
        Self { name: name.into(), tx }
    }

    /// Create a notifier together with the receiving end.
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(name, tx), rx)
    }
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.tx
            .send(notification.clone())
            .await
            .map_err(|_| NotifyError::ChannelClosed(self.name.clone()))
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}
