//! Admin handlers
//!
//! - GET /api/admin/connections - Live real-time connections (admin only)

use axum::{extract::State, Json};

use crate::models::ConnectionsResponse;
use crate::state::AppState;

/// GET /api/admin/connections
pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    let connections = state.registry.summaries().await;
    let authenticated = connections.iter().filter(|c| c.authenticated).count();

    Json(ConnectionsResponse {
        total: connections.len(),
        authenticated,
        connections,
    })
}
