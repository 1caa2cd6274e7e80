//! Everything the pipeline remembers about one subject.

use vigil_core::{Coordinates, SubjectId};
use vigil_geofence::GeofenceTracker;
use vigil_vitals::{VitalHistories, VitalsSnapshot};

/// Per-subject mutable state.
///
/// Exactly one writer at a time: either the [`Engine`](crate::Engine) map
/// entry or the subject's [`WorkerPool`](crate::WorkerPool) task.
#[derive(Debug, Clone)]
pub struct SubjectState {
    pub subject_id: SubjectId,
    pub histories: VitalHistories,
    pub vitals: VitalsSnapshot,
    pub geofence: GeofenceTracker,
    pub last_location: Option<Coordinates>,
    pub last_risk_score: Option<u8>,
}

impl SubjectState {
    pub fn new(subject_id: impl Into<SubjectId>, emergency_after_secs: u32) -> Self {
        let subject_id = subject_id.into();
        Self {
            geofence: GeofenceTracker::new(subject_id.clone(), emergency_after_secs),
            subject_id,
            histories: VitalHistories::new(),
            vitals: VitalsSnapshot::default(),
            last_location: None,
            last_risk_score: None,
        }
    }

    /// Outside every active zone and not inside a trusted one.
    pub fn in_risk_zone(&self) -> bool {
        let m = self.geofence.membership();
        !m.inside_active_zone && !m.inside_trusted_zone
    }
}
