use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::SubjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneEventKind {
    ZoneEnter,
    ZoneExit,
    Emergency,
}

impl std::fmt::Display for ZoneEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneEventKind::ZoneEnter => write!(f, "zone_enter"),
            ZoneEventKind::ZoneExit => write!(f, "zone_exit"),
            ZoneEventKind::Emergency => write!(f, "emergency"),
        }
    }
}

/// A membership transition for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneEvent {
    pub subject_id: SubjectId,
    pub kind: ZoneEventKind,
    /// Entered zone for `zone_enter`; last known safe zone otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    pub outside_seconds: u32,
    pub at: DateTime<Utc>,
}
