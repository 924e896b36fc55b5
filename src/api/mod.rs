//! API module - HTTP handlers and routes

mod admin_guard;
mod auth_middleware;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::realtime;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/admin/connections", get(handlers::list_connections))
        .route_layer(middleware::from_fn(admin_guard::require_admin));

    let protected = Router::new()
        // Device
        .route("/api/status", get(handlers::get_status))
        .route("/api/ping", get(handlers::ping))
        // Commands
        .route("/api/command/mode", post(handlers::set_mode))
        .route("/api/command/brightness", post(handlers::set_brightness))
        .route("/api/modo", post(handlers::set_mode))
        .route("/api/brillo", post(handlers::set_brightness))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware::require_auth,
        ));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Real-time channel (authenticates in-band)
        .route("/ws", get(realtime::ws_handler))
        .merge(protected)
}
