//! Command handlers
//!
//! - POST /api/command/mode       - `{mode: "auto"|"manual"}` (alias /api/modo, `{modo}`)
//! - POST /api/command/brightness - `{brightness: 0..255}` (alias /api/brillo, `{brillo}`)
//!
//! Unreadable bodies (no JSON content type, malformed JSON) are treated as
//! an empty command and rejected by validation with a JSON 400.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::commands::CommandKind;
use crate::error::AppError;
use crate::models::{CommandBody, Identity};
use crate::state::AppState;

/// POST /api/command/mode
pub async fn set_mode(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = command_body(body);
    let response = state
        .commands
        .handle(CommandKind::ModeChange, body.field("mode", "modo"), &identity)
        .await?;

    Ok(Json(response))
}

/// POST /api/command/brightness
pub async fn set_brightness(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = command_body(body);
    let response = state
        .commands
        .handle(
            CommandKind::BrightnessChange,
            body.field("brightness", "brillo"),
            &identity,
        )
        .await?;

    Ok(Json(response))
}

fn command_body(body: Result<Json<serde_json::Value>, JsonRejection>) -> CommandBody {
    match body {
        Ok(Json(value)) => CommandBody::new(value),
        Err(rejection) => {
            tracing::debug!("Unreadable command body: {}", rejection);
            CommandBody::default()
        }
    }
}
