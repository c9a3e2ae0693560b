use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::{internal_error, AppState, ErrorResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    /// Whether non-favorited rides in favorite parks also notify
    pub chatty_notifications: bool,
    pub selected_park: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChattyRequest {
    pub enabled: bool,
}

/// Current user settings
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current settings", body = SettingsResponse)
    ),
    tag = "settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        chatty_notifications: state.favorites.chatty(),
        selected_park: state.favorites.selected_park().await,
    })
}

/// Set the chatty-notifications flag
#[utoipa::path(
    put,
    path = "/api/settings/chatty",
    request_body = ChattyRequest,
    responses(
        (status = 200, description = "Updated settings", body = SettingsResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn set_chatty(
    State(state): State<AppState>,
    Json(request): Json<ChattyRequest>,
) -> Result<Json<SettingsResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .favorites
        .set_chatty(request.enabled)
        .await
        .map_err(internal_error)?;

    Ok(Json(SettingsResponse {
        chatty_notifications: state.favorites.chatty(),
        selected_park: state.favorites.selected_park().await,
    }))
}
