//! Incident detection and escalation pipeline.
//!
//! Composes the vitals, geofence, classification and dispatch stages over
//! per-subject state, and runs them either on a single-threaded [`Engine`]
//! or on a [`WorkerPool`] with one tokio task per subject.

pub mod engine;
pub mod events;
pub mod incident;
pub mod pipeline;
pub mod sink;
pub mod state;
pub mod worker;

pub use engine::Engine;
pub use events::{AnomalyEvent, EmergencyCleared, PipelineEvent, Rejected, RiskEvent};
pub use incident::Incident;
pub use pipeline::{Pipeline, PipelineSettings};
pub use sink::{ChannelSink, EventSink, FanoutSink, NotifyingSink};
pub use state::SubjectState;
pub use worker::{Command, WorkerError, WorkerPool};
