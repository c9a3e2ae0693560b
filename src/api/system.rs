use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::sync::{Phase, TransitionRecord};

#[derive(Debug, Serialize, ToSchema)]
pub struct ParkSyncState {
    pub park_id: String,
    pub last_synced: Option<String>,
    pub fetch_failed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SystemInfo {
    /// Number of parks being polled
    pub tracked_parks: usize,
    /// Whether the repeating poll timer is currently armed
    pub polling_active: bool,
    /// Current lifecycle phase
    pub phase: Phase,
    /// Seconds between foreground poll cycles
    pub poll_interval_seconds: u64,
    /// Timestamp of the most recent successful park sync
    pub last_updated: Option<String>,
    /// Per-park sync state
    pub parks: Vec<ParkSyncState>,
    pub server_version: String,
    /// Timestamp when this info was generated
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionListResponse {
    pub transitions: Vec<TransitionRecord>,
}

#[utoipa::path(
    get,
    path = "/api/system/info",
    responses(
        (status = 200, description = "Engine state and per-park sync info", body = SystemInfo)
    ),
    tag = "system"
)]
pub async fn get_system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    let mut parks: Vec<ParkSyncState> = state
        .engine
        .store()
        .park_states()
        .await
        .into_iter()
        .map(|(park_id, last_synced, fetch_failed)| ParkSyncState {
            park_id,
            last_synced: last_synced.map(|t| t.to_rfc3339()),
            fetch_failed,
        })
        .collect();
    parks.sort_by(|a, b| a.park_id.cmp(&b.park_id));

    Json(SystemInfo {
        tracked_parks: state.config.visible_parks().count(),
        polling_active: state.engine.is_polling().await,
        phase: state.lifecycle.phase().await,
        poll_interval_seconds: state.engine.config().interval_secs,
        last_updated: state.engine.last_updated().await.map(|t| t.to_rfc3339()),
        parks,
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Recent status transitions, oldest first, notified or not
#[utoipa::path(
    get,
    path = "/api/system/transitions",
    responses(
        (status = 200, description = "Recent status transitions", body = TransitionListResponse)
    ),
    tag = "system"
)]
pub async fn get_transitions(State(state): State<AppState>) -> Json<TransitionListResponse> {
    Json(TransitionListResponse {
        transitions: state.engine.recent_transitions().await,
    })
}
