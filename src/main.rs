pub mod api;
mod config;
mod favorites;
mod models;
mod providers;
mod services;
mod store;
mod sync;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use favorites::FavoritesStore;
use providers::themeparks::ThemeParksClient;
use services::notify::TracingNotifier;
use sync::{Lifecycle, SyncManager};

#[derive(OpenApi)]
#[openapi(
    info(title = "Ride Status API", version = "0.1.0"),
    paths(
        api::parks::list_parks,
        api::parks::select_park,
        api::parks::toggle_park_favorite,
        api::rides::list_park_rides,
        api::rides::toggle_ride_favorite,
        api::settings::get_settings,
        api::settings::set_chatty,
        api::system::get_system_info,
        api::system::get_transitions,
        api::lifecycle::enter_foreground,
        api::lifecycle::enter_background,
        api::lifecycle::background_tick,
    ),
    components(schemas(
        api::ErrorResponse,
        api::parks::ParkListResponse,
        api::parks::SelectParkResponse,
        api::parks::FavoriteResponse,
        api::rides::ParkRidesResponse,
        api::settings::SettingsResponse,
        api::settings::ChattyRequest,
        api::system::SystemInfo,
        api::system::ParkSyncState,
        api::system::TransitionListResponse,
        api::lifecycle::LifecycleResponse,
        api::lifecycle::TickRequest,
        api::lifecycle::TickResponse,
        models::Park,
        models::RideStatus,
        models::RideStatusKind,
        sync::Phase,
        sync::TransitionRecord,
    )),
    tags(
        (name = "parks", description = "Tracked theme parks"),
        (name = "rides", description = "Live ride statuses"),
        (name = "settings", description = "Notification preferences"),
        (name = "system", description = "Engine state and diagnostics"),
        (name = "lifecycle", description = "Foreground/background hooks")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(parks = config.parks.len(), "Loaded configuration");

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let pool = SqlitePool::connect("sqlite:database/ridewatch.db?mode=rwc")
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(migrations = migrator.migrations.len(), "Found migrations");
    migrator.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Load persisted favorites and settings
    let favorites = Arc::new(
        FavoritesStore::load(pool.clone())
            .await
            .expect("Failed to load favorites"),
    );

    // HTTP client with a diagnostics channel for the debug WebSocket
    let (diagnostics_tx, _) = broadcast::channel(64);
    let client = ThemeParksClient::new(config.sync.max_concurrent_requests, diagnostics_tx.clone())
        .expect("Failed to build status API client");

    let tracked_parks: Vec<_> = config.visible_parks().cloned().collect();
    let engine = Arc::new(SyncManager::new(
        client,
        tracked_parks,
        favorites.clone(),
        Arc::new(TracingNotifier),
        config.sync.clone(),
    ));

    // Start in the foreground phase: poll timer armed, immediate refresh
    let lifecycle = Arc::new(Lifecycle::new(engine.clone()));
    lifecycle.on_enter_foreground().await;

    let state = api::AppState {
        config: Arc::new(config),
        engine,
        lifecycle,
        favorites,
    };

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(state, diagnostics_tx))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Ride Status API"
}
