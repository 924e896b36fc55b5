//! Data models for the lighting gateway

use serde::{Deserialize, Serialize};

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

/// Authenticated principal, derived from a validated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// JWT claims as issued by the login service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    pub exp: usize,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.user_id,
            username: claims.username,
            role: claims.role,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Lighting mode accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    Manual,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
        }
    }
}

/// A validated operator command, alive for one request only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetMode(Mode),
    SetBrightness(u8),
}

impl Command {
    /// Device endpoint the command is forwarded to
    pub fn endpoint(&self) -> &'static str {
        match self {
            Command::SetMode(_) => "/api/modo",
            Command::SetBrightness(_) => "/api/brillo",
        }
    }

    /// Body understood by the ESP32 firmware
    pub fn device_payload(&self) -> serde_json::Value {
        match self {
            Command::SetMode(mode) => serde_json::json!({ "modo": mode.as_str() }),
            Command::SetBrightness(level) => serde_json::json!({ "brillo": level }),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::SetMode(_) => "mode_change",
            Command::SetBrightness(_) => "brightness_change",
        }
    }

    pub fn value(&self) -> serde_json::Value {
        match self {
            Command::SetMode(mode) => serde_json::Value::from(mode.as_str()),
            Command::SetBrightness(level) => serde_json::Value::from(*level),
        }
    }
}

// ============================================================================
// REST bodies
// ============================================================================

/// Raw command body. Only a JSON object carries fields; anything else
/// (arrays, scalars, an unreadable body) yields none and fails validation.
#[derive(Debug, Default)]
pub struct CommandBody(Option<serde_json::Value>);

impl CommandBody {
    pub fn new(value: serde_json::Value) -> Self {
        Self(Some(value))
    }

    /// Value of `name`, falling back to its legacy Spanish `alias`
    pub fn field(&self, name: &str, alias: &str) -> Option<&serde_json::Value> {
        let object = self.0.as_ref()?.as_object()?;
        object.get(name).or_else(|| object.get(alias))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceLink {
    Online,
    Offline,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: DeviceLink,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub device_address: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub total: usize,
    pub authenticated: usize,
    pub connections: Vec<ConnectionSummary>,
}
