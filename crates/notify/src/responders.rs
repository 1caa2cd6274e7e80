//! Nearest-responder selection.
//!
//! Decides *who* should be notified for an incident. Delivery is the
//! [`Dispatcher`](crate::Dispatcher)'s job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vigil_core::{haversine_km, Coordinates, Responder, ResponderClass};
use vigil_rules::EscalationAction;

/// One responder selected for one incident. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub responder_id: String,
    pub distance_km: f64,
    pub notified_at: DateTime<Utc>,
}

/// Responder classes that may be sent for `action`.
pub fn eligible_classes(action: EscalationAction) -> &'static [ResponderClass] {
    match action {
        EscalationAction::NotifyDashboard => &[],
        EscalationAction::NotifyResponder => &[ResponderClass::Security, ResponderClass::Medical],
        EscalationAction::EscalateAuthorities => &[ResponderClass::Police, ResponderClass::Medical],
    }
}

/// Responders whose class is eligible for `action`.
pub fn eligible_responders(action: EscalationAction, registry: &[Responder]) -> Vec<Responder> {
    let classes = eligible_classes(action);
    registry
        .iter()
        .filter(|r| classes.contains(&r.class))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponderDispatcher;

impl ResponderDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch(
        &self,
        incident_location: &Coordinates,
        registry: &[Responder],
        max_count: usize,
    ) -> Vec<DispatchRecord> {
        self.dispatch_at(incident_location, registry, max_count, Utc::now())
    }

    /// Pick the `max_count` nearest responders, nearest first.
    ///
    /// Equal distances are ordered by responder id so the same input always
    /// yields the same order. An empty registry yields an empty list.
    pub fn dispatch_at(
        &self,
        incident_location: &Coordinates,
        registry: &[Responder],
        max_count: usize,
        now: DateTime<Utc>,
    ) -> Vec<DispatchRecord> {
        let mut ranked: Vec<(f64, &Responder)> = registry
            .iter()
            .map(|r| (haversine_km(incident_location, &r.location), r))
            .collect();

        ranked.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));

        let records: Vec<DispatchRecord> = ranked
            .into_iter()
            .take(max_count)
            .map(|(distance_km, r)| DispatchRecord {
                responder_id: r.id.clone(),
                distance_km,
                notified_at: now,
            })
            .collect();

        debug!(
            candidates = registry.len(),
            selected = records.len(),
            nearest_km = records.first().map(|r| r.distance_km),
            "responders selected"
        );
        records
    }
}
