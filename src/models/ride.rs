use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Operational state of an attraction as reported by the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatusKind {
    Operating,
    Down,
    Closed,
    Refurbishment,
    /// Anything the API reports that we do not recognize
    Unknown,
}

impl RideStatusKind {
    /// Map the API's status string onto the canonical enum. Unrecognized
    /// strings become `Unknown` rather than failing the entry.
    pub fn from_api(status: &str) -> Self {
        match status {
            "OPERATING" => RideStatusKind::Operating,
            "DOWN" => RideStatusKind::Down,
            "CLOSED" => RideStatusKind::Closed,
            "REFURBISHMENT" => RideStatusKind::Refurbishment,
            _ => RideStatusKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatusKind::Operating => "OPERATING",
            RideStatusKind::Down => "DOWN",
            RideStatusKind::Closed => "CLOSED",
            RideStatusKind::Refurbishment => "REFURBISHMENT",
            RideStatusKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for RideStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical per-ride status record, immutable within one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RideStatus {
    /// Stable attraction id, unique within a park
    pub id: String,
    pub park_id: String,
    pub name: String,
    pub status: RideStatusKind,
    /// Standby wait in minutes; present only while the ride is operating
    /// and the API supplied a value
    pub wait_minutes: Option<u32>,
    /// Source-reported update time (UTC)
    pub last_updated: DateTime<Utc>,
    /// Derived from the favorites set at diff time, not persisted here
    pub is_favorited: bool,
}

/// A detected change in a ride's status between two consecutive polls.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusTransition {
    pub park_id: String,
    pub ride_id: String,
    pub ride_name: String,
    /// None means this is the first observation of the ride in this
    /// process's lifetime; such records are never emitted by the differ.
    pub old_status: Option<RideStatusKind>,
    pub new_status: RideStatusKind,
}
