//! In-memory per-park table of the latest ride statuses.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::RideStatus;

/// Everything the store knows about one park.
#[derive(Debug, Clone, Default)]
pub struct ParkEntry {
    pub rides: Vec<RideStatus>,
    /// When this park last completed a successful replace
    pub last_synced: Option<DateTime<Utc>>,
    /// Whether the most recent poll attempt for this park failed; the ride
    /// list is then stale-but-valid
    pub fetch_failed: bool,
}

/// Per-park store of the latest ride status lists.
///
/// Replaces are whole-list swaps under the write lock, so a concurrent reader
/// observes either the pre-cycle or the post-cycle list, never a partial one.
/// The scheduler guarantees a single writer per park; writes for different
/// parks may interleave freely.
pub struct ParkRideStore {
    entries: RwLock<HashMap<String, ParkEntry>>,
}

impl ParkRideStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Ride list from the previous completed poll; empty if the park has
    /// never been polled.
    pub async fn previous(&self, park_id: &str) -> Vec<RideStatus> {
        let entries = self.entries.read().await;
        entries
            .get(park_id)
            .map(|e| e.rides.clone())
            .unwrap_or_default()
    }

    /// Atomically swap in a park's new ride list and clear its failure flag.
    pub async fn replace(&self, park_id: &str, rides: Vec<RideStatus>) -> DateTime<Utc> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(park_id.to_string()).or_default();
        entry.rides = rides;
        entry.last_synced = Some(now);
        entry.fetch_failed = false;
        now
    }

    /// Record a failed poll attempt, leaving the stale list in place.
    pub async fn mark_fetch_failed(&self, park_id: &str) {
        let mut entries = self.entries.write().await;
        entries.entry(park_id.to_string()).or_default().fetch_failed = true;
    }

    /// Current snapshot for presentation; None if the park was never polled
    /// and never failed.
    pub async fn snapshot(&self, park_id: &str) -> Option<ParkEntry> {
        let entries = self.entries.read().await;
        entries.get(park_id).cloned()
    }

    /// Sync state of every known park, for staleness indicators.
    pub async fn park_states(&self) -> Vec<(String, Option<DateTime<Utc>>, bool)> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(id, e)| (id.clone(), e.last_synced, e.fetch_failed))
            .collect()
    }
}

impl Default for ParkRideStore {
    fn default() -> Self {
        Self::new()
    }
}
