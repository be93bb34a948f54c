//! Route modules for Lectern Server

pub mod document;
pub mod health;
pub mod playback;
pub mod settings;
pub mod status;
pub mod ui;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let max_upload_bytes = state.config().server.max_upload_mb * 1024 * 1024;

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/document", document::router(max_upload_bytes))
        .nest("/api/v1/playback", playback::router())
        .nest("/api/v1/settings", settings::router())
        .route("/api/v1/voices", get(settings::list_voices))
        .route("/api/v1/status", get(status::get_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
