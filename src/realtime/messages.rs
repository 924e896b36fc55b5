//! Wire messages of the real-time channel

use serde::{Deserialize, Serialize};

use crate::device::DeviceSnapshot;
use crate::models::{Identity, Mode};

/// Server -> client message. Serialized as `{"type": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    Connected {
        message: String,
    },
    AuthSuccess {
        identity: Identity,
    },
    AuthError {
        message: String,
    },
    StatusUpdate {
        data: DeviceSnapshot,
        timestamp: i64,
    },
    #[serde(rename = "esp32_offline")]
    DeviceOffline {
        message: String,
        timestamp: i64,
    },
    ModeChanged {
        mode: Mode,
        user: String,
    },
    BrightnessChanged {
        brightness: u8,
        user: String,
    },
}

impl BroadcastEvent {
    pub fn connected() -> Self {
        Self::Connected {
            message: "Conectado al servidor".to_string(),
        }
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn status_update(data: DeviceSnapshot) -> Self {
        Self::StatusUpdate {
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn device_offline() -> Self {
        Self::DeviceOffline {
            message: "ESP32 no disponible".to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::AuthSuccess { .. } => "auth_success",
            Self::AuthError { .. } => "auth_error",
            Self::StatusUpdate { .. } => "status_update",
            Self::DeviceOffline { .. } => "esp32_offline",
            Self::ModeChanged { .. } => "mode_changed",
            Self::BrightnessChanged { .. } => "brightness_changed",
        }
    }
}

/// Client -> server message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Auth {
        #[serde(default)]
        token: String,
    },
}

impl ClientMessage {
    /// `None` for frames that are not `auth` messages (ignored by the
    /// handler); `Some(Err)` for an `auth` message with a malformed body.
    pub fn parse(text: &str) -> Option<Result<Self, serde_json::Error>> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        if value.get("type").and_then(|t| t.as_str()) != Some("auth") {
            return None;
        }
        Some(serde_json::from_value(value))
    }
}
