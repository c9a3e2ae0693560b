//! HTTP entry points for the lifecycle hooks. In a deployment with an OS
//! task scheduler these are called by it; they are also handy for driving
//! the engine manually.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::sync::Phase;

#[derive(Debug, Serialize, ToSchema)]
pub struct LifecycleResponse {
    pub phase: Phase,
    pub polling_active: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TickRequest {
    /// Budget in seconds for this refresh; defaults to the configured
    /// background budget
    pub budget_secs: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TickResponse {
    /// Whether every park finished its refresh within the budget
    pub completed: bool,
    pub budget_secs: u64,
}

/// Enter the foreground phase: arm the poll timer and refresh immediately
#[utoipa::path(
    post,
    path = "/api/lifecycle/foreground",
    responses(
        (status = 200, description = "Foreground phase entered", body = LifecycleResponse)
    ),
    tag = "lifecycle"
)]
pub async fn enter_foreground(State(state): State<AppState>) -> Json<LifecycleResponse> {
    state.lifecycle.on_enter_foreground().await;
    Json(LifecycleResponse {
        phase: state.lifecycle.phase().await,
        polling_active: state.engine.is_polling().await,
    })
}

/// Enter the background phase: stop the poll timer
#[utoipa::path(
    post,
    path = "/api/lifecycle/background",
    responses(
        (status = 200, description = "Background phase entered", body = LifecycleResponse)
    ),
    tag = "lifecycle"
)]
pub async fn enter_background(State(state): State<AppState>) -> Json<LifecycleResponse> {
    state.lifecycle.on_enter_background().await;
    Json(LifecycleResponse {
        phase: state.lifecycle.phase().await,
        polling_active: state.engine.is_polling().await,
    })
}

/// One bounded background refresh across all parks
#[utoipa::path(
    post,
    path = "/api/lifecycle/tick",
    request_body = TickRequest,
    responses(
        (status = 200, description = "Refresh outcome", body = TickResponse)
    ),
    tag = "lifecycle"
)]
pub async fn background_tick(
    State(state): State<AppState>,
    request: Option<Json<TickRequest>>,
) -> Json<TickResponse> {
    let budget = request
        .and_then(|Json(r)| r.budget_secs)
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.engine.config().background_budget());

    let completed = state.lifecycle.on_background_tick(budget).await;

    Json(TickResponse {
        completed,
        budget_secs: budget.as_secs(),
    })
}
