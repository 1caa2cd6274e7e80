//! Which zones contain a position.

use vigil_core::{Coordinates, SafeZone};

/// Containing zones for one position.
///
/// When several zones overlap, the one whose center is nearest wins; equal
/// distances fall back to zone id so the choice is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipView<'a> {
    /// Nearest containing zone with `active = true`.
    pub active: Option<&'a SafeZone>,
    /// Nearest containing zone with `trusted = true`, active or not.
    pub trusted: Option<&'a SafeZone>,
}

impl MembershipView<'_> {
    pub fn inside_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn inside_trusted(&self) -> bool {
        self.trusted.is_some()
    }
}

pub fn evaluate_membership<'a>(position: &Coordinates, zones: &'a [SafeZone]) -> MembershipView<'a> {
    let mut active: Option<(f64, &SafeZone)> = None;
    let mut trusted: Option<(f64, &SafeZone)> = None;

    for zone in zones {
        let d = zone.center.distance_to(position);
        if d > zone.radius_meters {
            continue;
        }
        if zone.active {
            active = nearer(active, d, zone);
        }
        if zone.trusted {
            trusted = nearer(trusted, d, zone);
        }
    }

    MembershipView {
        active: active.map(|(_, z)| z),
        trusted: trusted.map(|(_, z)| z),
    }
}

fn nearer<'a>(
    current: Option<(f64, &'a SafeZone)>,
    d: f64,
    zone: &'a SafeZone,
) -> Option<(f64, &'a SafeZone)> {
    match current {
        Some((best, z)) if best < d || (best == d && z.id <= zone.id) => Some((best, z)),
        _ => Some((d, zone)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, lat: f64, radius: f64, active: bool, trusted: bool) -> SafeZone {
        SafeZone {
            id: id.to_string(),
            name: id.to_uppercase(),
            center: Coordinates::new(lat, 0.0),
            radius_meters: radius,
            active,
            trusted,
        }
    }

    #[test]
    fn outside_everything() {
        let zones = vec![zone("a", 0.0, 100.0, true, false)];
        let view = evaluate_membership(&Coordinates::new(1.0, 0.0), &zones);
        assert!(!view.inside_active());
        assert!(!view.inside_trusted());
    }

    #[test]
    fn inactive_zone_does_not_count_as_active() {
        let zones = vec![zone("a", 0.0, 1000.0, false, false)];
        let view = evaluate_membership(&Coordinates::new(0.0, 0.0), &zones);
        assert!(!view.inside_active());
    }

    #[test]
    fn trusted_tracked_independently() {
        // Inactive but trusted zone still reports trusted membership.
        let zones = vec![zone("t", 0.0, 1000.0, false, true)];
        let view = evaluate_membership(&Coordinates::new(0.0, 0.0), &zones);
        assert!(!view.inside_active());
        assert!(view.inside_trusted());
    }

    #[test]
    fn overlapping_zones_pick_nearest_center() {
        let zones = vec![
            zone("far", 0.005, 2000.0, true, false),
            zone("near", 0.0001, 2000.0, true, false),
        ];
        let view = evaluate_membership(&Coordinates::new(0.0, 0.0), &zones);
        assert_eq!(view.active.map(|z| z.id.as_str()), Some("near"));
    }

    #[test]
    fn equal_distance_breaks_tie_by_id() {
        let zones = vec![
            zone("b", 0.0, 500.0, true, false),
            zone("a", 0.0, 500.0, true, false),
        ];
        let view = evaluate_membership(&Coordinates::new(0.0, 0.0), &zones);
        assert_eq!(view.active.map(|z| z.id.as_str()), Some("a"));
    }

    #[test]
    fn empty_registry_is_always_outside() {
        let view = evaluate_membership(&Coordinates::new(0.0, 0.0), &[]);
        assert_eq!(view, MembershipView::default());
    }
}
