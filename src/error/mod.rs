//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Credential failures, shared by the REST gate and the WebSocket handshake
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token no proporcionado")]
    MissingToken,

    #[error("El token proporcionado no es válido")]
    InvalidToken,

    #[error("Tu sesión ha expirado, por favor inicia sesión nuevamente")]
    ExpiredToken,

    #[error("Usuario no válido")]
    InactiveUser,
}

impl AuthError {
    fn title(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::InactiveUser => "Acceso denegado",
            AuthError::InvalidToken => "Token inválido",
            AuthError::ExpiredToken => "Token expirado",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Modo inválido. Usar: auto o manual")]
    InvalidMode,

    #[error("Brillo debe estar entre 0 y 255")]
    InvalidBrightnessRange,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device unavailable: {0}")]
    Unavailable(String),

    #[error("device timed out")]
    Timeout,
}

impl DeviceError {
    /// Operator-facing text; transport detail stays in the logs
    pub fn public_message(&self) -> &'static str {
        match self {
            DeviceError::Unavailable(_) => "No se pudo contactar con el dispositivo",
            DeviceError::Timeout => "El dispositivo no respondió a tiempo",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Forbidden: role {0} required")]
    Forbidden(crate::models::Role),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Status query could not reach the device
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(DeviceError),

    /// Command forwarding failed at the device
    #[error("Device command failed: {0}")]
    DeviceCommand(DeviceError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Auth(e) => (StatusCode::UNAUTHORIZED, e.title(), e.to_string()),
            AppError::Forbidden(_) => (
                StatusCode::FORBIDDEN,
                "Acceso denegado",
                "Se requieren privilegios de administrador".to_string(),
            ),
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "Solicitud inválida",
                e.to_string(),
            ),
            AppError::DeviceUnavailable(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ESP32 no disponible",
                e.public_message().to_string(),
            ),
            AppError::DeviceCommand(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Error al comunicar con ESP32",
                e.public_message().to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error interno",
                "Error interno del servidor".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::DeviceUnavailable(_) | AppError::DeviceCommand(_) => {
                tracing::warn!("{}", self);
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
            }
            _ => {}
        }

        let (status, error, message) = self.parts();

        let body = Json(serde_json::json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}
