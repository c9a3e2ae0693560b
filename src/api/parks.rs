use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::{internal_error, not_found, AppState, ErrorResponse};
use crate::models::Park;

#[derive(Debug, Serialize, ToSchema)]
pub struct ParkListResponse {
    pub parks: Vec<Park>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelectParkResponse {
    pub selected_park: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub id: String,
    pub is_favorited: bool,
}

/// List all visible parks with their favorite/selected state
#[utoipa::path(
    get,
    path = "/api/parks",
    responses(
        (status = 200, description = "List of tracked parks", body = ParkListResponse)
    ),
    tag = "parks"
)]
pub async fn list_parks(State(state): State<AppState>) -> Json<ParkListResponse> {
    let selected = state.favorites.selected_park().await;

    let mut parks = Vec::new();
    for park in state.config.visible_parks() {
        parks.push(Park {
            id: park.id.clone(),
            name: park.name.clone(),
            is_visible: park.visible,
            is_favorited: state.favorites.is_park_favorited(&park.id).await,
            is_selected: selected.as_deref() == Some(park.id.as_str()),
            timezone: park.timezone.clone(),
        });
    }

    Json(ParkListResponse { parks })
}

/// Make a park the selected one for the ride list view
#[utoipa::path(
    post,
    path = "/api/parks/{id}/select",
    params(("id" = String, Path, description = "Park entity id")),
    responses(
        (status = 200, description = "Park selected", body = SelectParkResponse),
        (status = 404, description = "Unknown park", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "parks"
)]
pub async fn select_park(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SelectParkResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.config.visible_parks().any(|p| p.id == id) {
        return Err(not_found(format!("unknown park: {}", id)));
    }

    state
        .favorites
        .select_park(&id)
        .await
        .map_err(internal_error)?;

    Ok(Json(SelectParkResponse { selected_park: id }))
}

/// Toggle a park's favorite flag; returns the new state
#[utoipa::path(
    post,
    path = "/api/parks/{id}/favorite",
    params(("id" = String, Path, description = "Park entity id")),
    responses(
        (status = 200, description = "New favorite state", body = FavoriteResponse),
        (status = 404, description = "Unknown park", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "parks"
)]
pub async fn toggle_park_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.config.visible_parks().any(|p| p.id == id) {
        return Err(not_found(format!("unknown park: {}", id)));
    }

    let is_favorited = state
        .favorites
        .toggle_park(&id)
        .await
        .map_err(internal_error)?;

    Ok(Json(FavoriteResponse { id, is_favorited }))
}
