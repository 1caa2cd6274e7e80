//! Safe-zone and responder registries.
//!
//! Both registries are owned by a configuration collaborator and handed to
//! the pipeline as read-only snapshots. The core never writes to them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VigilError};
use crate::geo::Coordinates;

/// Circular geofence around `center`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeZone {
    pub id: String,
    pub name: String,
    pub center: Coordinates,
    pub radius_meters: f64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub trusted: bool,
}

fn default_true() -> bool {
    true
}

impl SafeZone {
    /// Whether `position` lies within this zone's radius (boundary inclusive).
    pub fn contains(&self, position: &Coordinates) -> bool {
        self.center.distance_to(position) <= self.radius_meters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponderClass {
    Police,
    Security,
    Medical,
}

impl std::fmt::Display for ResponderClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponderClass::Police => write!(f, "police"),
            ResponderClass::Security => write!(f, "security"),
            ResponderClass::Medical => write!(f, "medical"),
        }
    }
}

/// A unit that can be dispatched to an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Responder {
    pub id: String,
    pub name: String,
    pub class: ResponderClass,
    pub location: Coordinates,
    #[serde(default)]
    pub contact: String,
}

/// Point-in-time view of both registries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub zones: Vec<SafeZone>,
    #[serde(default)]
    pub responders: Vec<Responder>,
}

impl RegistrySnapshot {
    /// Check ids are unique, radii positive and coordinates in range.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for zone in &self.zones {
            if zone.id.is_empty() {
                return Err(VigilError::Other("zone id must not be empty".to_string()));
            }
            if !seen.insert(format!("zone:{}", zone.id)) {
                return Err(VigilError::Other(format!("duplicate zone id '{}'", zone.id)));
            }
            if !(zone.radius_meters.is_finite() && zone.radius_meters > 0.0) {
                return Err(VigilError::Other(format!(
                    "zone '{}' radius must be positive, got {}",
                    zone.id, zone.radius_meters
                )));
            }
            if !zone.center.is_valid() {
                return Err(VigilError::Other(format!("zone '{}' has invalid center", zone.id)));
            }
        }
        for responder in &self.responders {
            if responder.id.is_empty() {
                return Err(VigilError::Other("responder id must not be empty".to_string()));
            }
            if !seen.insert(format!("responder:{}", responder.id)) {
                return Err(VigilError::Other(format!(
                    "duplicate responder id '{}'",
                    responder.id
                )));
            }
            if !responder.location.is_valid() {
                return Err(VigilError::Other(format!(
                    "responder '{}' has invalid location",
                    responder.id
                )));
            }
        }
        Ok(())
    }
}

/// Read access to the current registries.
///
/// `zones()` may fail with [`VigilError::StaleZoneConfiguration`]; callers
/// must then behave as if no zone is active.
pub trait RegistrySource: Send + Sync {
    fn zones(&self) -> Result<Arc<[SafeZone]>>;

    /// Responders are always answerable; an empty registry is a valid state.
    fn responders(&self) -> Arc<[Responder]>;
}

/// Fixed, in-memory registry.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    zones: Arc<[SafeZone]>,
    responders: Arc<[Responder]>,
}

impl StaticRegistry {
    pub fn new(zones: Vec<SafeZone>, responders: Vec<Responder>) -> Self {
        Self {
            zones: zones.into(),
            responders: responders.into(),
        }
    }

    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self::new(snapshot.zones, snapshot.responders)
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl RegistrySource for StaticRegistry {
    fn zones(&self) -> Result<Arc<[SafeZone]>> {
        Ok(Arc::clone(&self.zones))
    }

    fn responders(&self) -> Arc<[Responder]> {
        Arc::clone(&self.responders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, radius: f64) -> SafeZone {
        SafeZone {
            id: id.to_string(),
            name: format!("Zone {id}"),
            center: Coordinates::new(6.9271, 79.8612),
            radius_meters: radius,
            active: true,
            trusted: false,
        }
    }

    #[test]
    fn contains_is_boundary_inclusive() {
        let z = zone("home", 100.0);
        assert!(z.contains(&z.center));
        // ~0.0009 deg latitude is ~100m
        let inside = Coordinates::new(z.center.lat + 0.0008, z.center.lng);
        let outside = Coordinates::new(z.center.lat + 0.0010, z.center.lng);
        assert!(z.contains(&inside));
        assert!(!z.contains(&outside));
    }

    #[test]
    fn zone_defaults_active_untrusted() {
        let z: SafeZone = serde_json::from_str(
            r#"{"id":"h","name":"Home","center":{"lat":1.0,"lng":2.0},"radiusMeters":50}"#,
        )
        .unwrap();
        assert!(z.active);
        assert!(!z.trusted);
    }

    #[test]
    fn validate_rejects_duplicates_and_bad_radius() {
        let snap = RegistrySnapshot {
            zones: vec![zone("a", 10.0), zone("a", 20.0)],
            responders: vec![],
        };
        assert!(snap.validate().is_err());

        let snap = RegistrySnapshot {
            zones: vec![zone("a", 0.0)],
            responders: vec![],
        };
        assert!(snap.validate().is_err());

        let snap = RegistrySnapshot {
            zones: vec![zone("a", 10.0), zone("b", 20.0)],
            responders: vec![],
        };
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn static_registry_serves_snapshot() {
        let reg = StaticRegistry::new(vec![zone("a", 10.0)], vec![]);
        assert_eq!(reg.zones().unwrap().len(), 1);
        assert!(reg.responders().is_empty());
    }
}
