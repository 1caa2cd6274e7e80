//! Notification boundary for classified incidents.
//!
//! This crate provides:
//! - `ResponderDispatcher` nearest-responder selection and class eligibility
//! - `Notifier` trait for pluggable notification channels
//! - Log and tokio-channel notifier implementations
//! - Minijinja template rendering for notification messages
//! - Dispatcher that routes notifications by escalation action

pub mod channel;
pub mod dispatcher;
pub mod log;
pub mod responders;
pub mod templating;
pub mod traits;

pub use channel::ChannelNotifier;
pub use dispatcher::Dispatcher;
pub use log::LogNotifier;
pub use responders::{eligible_classes, eligible_responders, DispatchRecord, ResponderDispatcher};
pub use templating::{IncidentContext, MessageTemplate, ResponderContext, TemplateContext, TemplateRenderer};
pub use traits::{DeliveryResult, Notification, Notifier, NotifyError};
