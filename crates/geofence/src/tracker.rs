//! Zone membership state machine for a single subject.
//!
//! ```text
//!            exit all active zones              outside >= threshold (once)
//!   Inside ─────────────────────────▶ OutsideTimed ─────────────────────────▶ Emergency
//!     ▲                                    │                                     │
//!     └──────── enter any active zone ─────┘          clear_emergency() only ────┘
//! ```
//!
//! `Emergency` is sticky: re-entering a zone updates membership and emits
//! `zone_enter`, but the latch stays set until [`GeofenceTracker::clear_emergency`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vigil_core::{Coordinates, SafeZone, SubjectId};

use crate::events::{ZoneEvent, ZoneEventKind};
use crate::membership::evaluate_membership;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Inside,
    OutsideTimed,
    Emergency,
}

/// Per-subject membership flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMembershipState {
    pub inside_active_zone: bool,
    pub inside_trusted_zone: bool,
    pub outside_since_seconds: u32,
    pub emergency_active: bool,
}

impl Default for ZoneMembershipState {
    /// A subject with no position yet is presumed inside.
    fn default() -> Self {
        Self {
            inside_active_zone: true,
            inside_trusted_zone: false,
            outside_since_seconds: 0,
            emergency_active: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeofenceTracker {
    subject_id: SubjectId,
    state: TrackerState,
    membership: ZoneMembershipState,
    last_zone: Option<String>,
    emergency_after_secs: u32,
    /// Latest timestamp seen, from a fix or a tick.
    clock: Option<DateTime<Utc>>,
}

impl GeofenceTracker {
    pub fn new(subject_id: impl Into<SubjectId>, emergency_after_secs: u32) -> Self {
        Self {
            subject_id: subject_id.into(),
            state: TrackerState::Inside,
            membership: ZoneMembershipState::default(),
            last_zone: None,
            emergency_after_secs,
            clock: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn membership(&self) -> &ZoneMembershipState {
        &self.membership
    }

    /// Name of the most recent active zone the subject was inside.
    pub fn last_zone(&self) -> Option<&str> {
        self.last_zone.as_deref()
    }

    pub fn emergency_active(&self) -> bool {
        self.state == TrackerState::Emergency
    }

    /// Apply one location fix taken at `at`, crediting the outside timer with
    /// the time since the previous fix or tick.
    pub fn observe_at(
        &mut self,
        position: &Coordinates,
        zones: &[SafeZone],
        at: DateTime<Utc>,
    ) -> Vec<ZoneEvent> {
        let elapsed = self.elapsed_until(at);
        self.observe(position, zones, elapsed, at)
    }

    /// Move the clock to `now` without a new position.
    pub fn advance_to(&mut self, now: DateTime<Utc>) -> Option<ZoneEvent> {
        let elapsed = self.elapsed_until(now);
        self.advance(elapsed, now)
    }

    /// Apply one location sample.
    ///
    /// `zones` is the current registry snapshot; an empty slice (including
    /// the stale-registry fallback) means the subject is outside.
    /// `elapsed_secs` is credited to the outside timer when the sample does
    /// not itself mark an exit.
    pub fn observe(
        &mut self,
        position: &Coordinates,
        zones: &[SafeZone],
        elapsed_secs: u32,
        at: DateTime<Utc>,
    ) -> Vec<ZoneEvent> {
        let view = evaluate_membership(position, zones);
        let was_inside = self.membership.inside_active_zone;
        let mut events = Vec::new();

        self.membership.inside_trusted_zone = view.inside_trusted();

        match view.active {
            Some(zone) => {
                self.membership.inside_active_zone = true;
                self.membership.outside_since_seconds = 0;
                self.last_zone = Some(zone.name.clone());
                if !was_inside {
                    events.push(self.event(ZoneEventKind::ZoneEnter, at));
                }
                if self.state == TrackerState::OutsideTimed {
                    self.state = TrackerState::Inside;
                }
            }
            None => {
                self.membership.inside_active_zone = false;
                if was_inside {
                    self.membership.outside_since_seconds = 0;
                    events.push(self.event(ZoneEventKind::ZoneExit, at));
                    if self.state == TrackerState::Inside {
                        self.state = TrackerState::OutsideTimed;
                    }
                } else {
                    events.extend(self.advance(elapsed_secs, at));
                }
            }
        }

        if !events.is_empty() {
            debug!(
                subject_id = %self.subject_id,
                state = ?self.state,
                outside_secs = self.membership.outside_since_seconds,
                events = events.len(),
                "geofence transition"
            );
        }
        events
    }

    /// Let time pass without a new position.
    ///
    /// Only moves the outside timer; fires the emergency latch at most once
    /// per continuous outside period.
    pub fn advance(&mut self, elapsed_secs: u32, at: DateTime<Utc>) -> Option<ZoneEvent> {
        if self.membership.inside_active_zone {
            return None;
        }
        self.membership.outside_since_seconds = self
            .membership
            .outside_since_seconds
            .saturating_add(elapsed_secs);

        if self.state == TrackerState::OutsideTimed
            && self.membership.outside_since_seconds >= self.emergency_after_secs
        {
            self.state = TrackerState::Emergency;
            self.membership.emergency_active = true;
            info!(
                subject_id = %self.subject_id,
                outside_secs = self.membership.outside_since_seconds,
                last_zone = ?self.last_zone,
                "geofence emergency latched"
            );
            return Some(self.event(ZoneEventKind::Emergency, at));
        }
        None
    }

    /// Human acknowledgment. Returns `false` if no emergency was latched.
    ///
    /// After clearing, the outside timer restarts from zero, so a subject
    /// still outside needs a full new period before the latch fires again.
    pub fn clear_emergency(&mut self) -> bool {
        if self.state != TrackerState::Emergency {
            return false;
        }
        self.membership.emergency_active = false;
        self.membership.outside_since_seconds = 0;
        self.state = if self.membership.inside_active_zone {
            TrackerState::Inside
        } else {
            TrackerState::OutsideTimed
        };
        info!(subject_id = %self.subject_id, state = ?self.state, "geofence emergency cleared");
        true
    }

    /// Whole seconds since the last fix or tick. The first timestamp and any
    /// out-of-order one count as zero and never move the clock back.
    fn elapsed_until(&mut self, at: DateTime<Utc>) -> u32 {
        let elapsed = match self.clock {
            Some(prev) => u32::try_from((at - prev).num_seconds().max(0)).unwrap_or(u32::MAX),
            None => 0,
        };
        if self.clock.map_or(true, |prev| at > prev) {
            self.clock = Some(at);
        }
        elapsed
    }

    fn event(&self, kind: ZoneEventKind, at: DateTime<Utc>) -> ZoneEvent {
        ZoneEvent {
            subject_id: self.subject_id.clone(),
            kind,
            zone_name: self.last_zone.clone(),
            outside_seconds: self.membership.outside_since_seconds,
            at,
        }
    }
}
