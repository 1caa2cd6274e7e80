//! Escalation rules for classified incidents.
//!
//! This crate provides:
//! - Incident descriptor and escalation action types
//! - The fixed-priority alert classifier
//! - A per-subject in-memory audit log
//! - YAML safe-zone/responder registry loader with hot reload via `notify`

pub mod audit_log;
pub mod classifier;
pub mod incident;
pub mod registry;

pub use audit_log::{AuditEntry, AuditLog, AuditPhase, AuditQuery, LogLevel};
pub use classifier::AlertClassifier;
pub use incident::{EscalationAction, IncidentDescriptor, LocationRisk, TimeOfDay};
pub use registry::{LoadedRegistry, RegistryError, RegistryLoader};
