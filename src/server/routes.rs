//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        // HTML UI
        .route("/", get(handlers::index))
        .route("/summarise", post(handlers::summarise_form))
        // JSON API
        .route("/api/summarise", post(handlers::api_summarise))
        .route("/api/modes", get(handlers::api_modes))
        .route("/health", get(handlers::health))
        // Static assets
        .route("/static/style.css", get(handlers::serve_css))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
