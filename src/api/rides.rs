use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::{internal_error, not_found, AppState, ErrorResponse};
use crate::api::parks::FavoriteResponse;
use crate::models::RideStatus;

#[derive(Debug, Serialize, ToSchema)]
pub struct ParkRidesResponse {
    pub park_id: String,
    pub rides: Vec<RideStatus>,
    /// When the park last completed a successful poll; None before the
    /// first one
    pub last_synced: Option<String>,
    /// Whether the most recent poll attempt failed (the ride list is then
    /// stale)
    pub fetch_failed: bool,
}

/// Current ride statuses for one park, straight from the in-memory store
#[utoipa::path(
    get,
    path = "/api/parks/{id}/rides",
    params(("id" = String, Path, description = "Park entity id")),
    responses(
        (status = 200, description = "Latest ride statuses for the park", body = ParkRidesResponse),
        (status = 404, description = "Unknown park", body = ErrorResponse)
    ),
    tag = "rides"
)]
pub async fn list_park_rides(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParkRidesResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.config.visible_parks().any(|p| p.id == id) {
        return Err(not_found(format!("unknown park: {}", id)));
    }

    // A park that has not been polled yet simply has no rides
    let entry = state.engine.store().snapshot(&id).await.unwrap_or_default();

    Ok(Json(ParkRidesResponse {
        park_id: id,
        rides: entry.rides,
        last_synced: entry.last_synced.map(|t| t.to_rfc3339()),
        fetch_failed: entry.fetch_failed,
    }))
}

/// Toggle a ride's favorite flag; returns the new state. Takes effect on the
/// next poll cycle's gating decision.
#[utoipa::path(
    post,
    path = "/api/rides/{id}/favorite",
    params(("id" = String, Path, description = "Ride entity id")),
    responses(
        (status = 200, description = "New favorite state", body = FavoriteResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "rides"
)]
pub async fn toggle_ride_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let is_favorited = state
        .favorites
        .toggle_ride(&id)
        .await
        .map_err(internal_error)?;

    Ok(Json(FavoriteResponse { id, is_favorited }))
}
