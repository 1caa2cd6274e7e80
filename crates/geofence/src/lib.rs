//! Per-subject geofence tracking.
//!
//! Zone membership is recomputed from each location sample against the
//! current safe-zone snapshot. Transitions in and out of active zones are
//! reported as [`ZoneEvent`]s, and prolonged absence trips a one-shot
//! emergency latch that only an explicit acknowledgment can clear.

pub mod events;
pub mod membership;
pub mod tracker;

pub use events::{ZoneEvent, ZoneEventKind};
pub use membership::{evaluate_membership, MembershipView};
pub use tracker::{GeofenceTracker, TrackerState, ZoneMembershipState};
