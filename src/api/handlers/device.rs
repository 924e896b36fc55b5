//! Device status handlers
//!
//! - GET /api/status - Current controller status (proxied)
//! - GET /api/ping   - Reachability and latency, never fails

use std::time::Instant;

use axum::{extract::State, Json};

use crate::error::AppError;
use crate::models::{DeviceLink, PingResponse};
use crate::state::AppState;

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    // REST-initiated reads share the forwarding timeout, not the poll timeout
    let snapshot = state
        .device
        .get_status(state.device_config.command_timeout())
        .await
        .map_err(AppError::DeviceUnavailable)?;

    Ok(Json(snapshot))
}

/// GET /api/ping
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let start = Instant::now();
    let result = state
        .device
        .get_status(state.device_config.status_timeout())
        .await;

    let device_address = state.device.address().to_string();

    Json(match result {
        Ok(_) => PingResponse {
            status: DeviceLink::Online,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            device_address,
        },
        Err(e) => {
            tracing::debug!("Ping to {} failed: {}", device_address, e);
            PingResponse {
                status: DeviceLink::Offline,
                latency_ms: None,
                error: Some(e.public_message().to_string()),
                device_address,
            }
        }
    })
}
