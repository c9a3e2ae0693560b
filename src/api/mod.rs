pub mod error;
pub mod lifecycle;
pub mod parks;
pub mod rides;
pub mod settings;
pub mod system;
pub mod ws;

pub use error::{internal_error, not_found, ErrorResponse};

use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;

use crate::config::Config;
use crate::favorites::FavoritesStore;
use crate::providers::themeparks::{FetchLogSender, ThemeParksClient};
use crate::sync::{Lifecycle, SyncManager};

/// The engine as wired in production, with the real HTTP client.
pub type Engine = SyncManager<ThemeParksClient>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<Engine>,
    pub lifecycle: Arc<Lifecycle<ThemeParksClient>>,
    pub favorites: Arc<FavoritesStore>,
}

pub fn router(state: AppState, diagnostics_tx: FetchLogSender) -> Router {
    let ws_state = ws::WsState {
        engine: state.engine.clone(),
    };
    let diagnostics_state = ws::DiagnosticsState::new(diagnostics_tx);

    Router::new()
        .route("/parks", get(parks::list_parks))
        .route("/parks/{id}/select", post(parks::select_park))
        .route("/parks/{id}/favorite", post(parks::toggle_park_favorite))
        .route("/parks/{id}/rides", get(rides::list_park_rides))
        .route("/rides/{id}/favorite", post(rides::toggle_ride_favorite))
        .route("/settings", get(settings::get_settings))
        .route("/settings/chatty", put(settings::set_chatty))
        .route("/system/info", get(system::get_system_info))
        .route("/system/transitions", get(system::get_transitions))
        .route("/lifecycle/foreground", post(lifecycle::enter_foreground))
        .route("/lifecycle/background", post(lifecycle::enter_background))
        .route("/lifecycle/tick", post(lifecycle::background_tick))
        .route("/ws/updates", get(ws::ws_updates).with_state(ws_state))
        .route(
            "/ws/diagnostics",
            get(ws::ws_diagnostics).with_state(diagnostics_state),
        )
        .with_state(state)
}
