//! Test doubles shared by unit tests

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::sync::mpsc;

use crate::auth::UserStore;
use crate::commands::CommandJournal;
use crate::config::{AuthConfig, Config};
use crate::device::{DeviceApi, DeviceSnapshot};
use crate::error::DeviceError;
use crate::models::{Command, Identity, Role, TokenClaims};
use crate::realtime::{BroadcastEvent, ConnectionId, ConnectionRegistry, OUTBOUND_BUFFER};
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-secret";

/// Sign a token; negative `ttl_secs` yields an already expired one
pub fn issue_token(secret: &str, user_id: &str, username: &str, role: Role, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        user_id: user_id.to_string(),
        username: username.to_string(),
        role,
        iat: None,
        exp: (now + ttl_secs).max(1) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn identity(username: &str) -> Identity {
    Identity {
        id: format!("u-{}", username),
        username: username.to_string(),
        role: Role::User,
    }
}

/// Register and promote a connection, returning its outbound receiver
pub async fn authenticated_connection(
    registry: &ConnectionRegistry,
    username: &str,
) -> (ConnectionId, mpsc::Receiver<Arc<str>>) {
    let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
    let id = registry.register(tx).await;
    registry.promote(&id, identity(username)).await.unwrap();
    (id, rx)
}

pub async fn next_event(rx: &mut mpsc::Receiver<Arc<str>>) -> BroadcastEvent {
    let frame = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("outbound queue closed");
    serde_json::from_str(&frame).unwrap()
}

// ============================================================================
// Collaborators
// ============================================================================

#[derive(Default)]
pub struct StaticUsers {
    users: HashMap<String, bool>,
}

impl StaticUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: &str, active: bool) -> Self {
        self.users.insert(user_id.to_string(), active);
        self
    }
}

#[async_trait]
impl UserStore for StaticUsers {
    async fn is_active(&self, user_id: &str) -> anyhow::Result<bool> {
        Ok(self.users.get(user_id).copied().unwrap_or(false))
    }
}

#[derive(Default)]
pub struct RecordingJournal {
    entries: Mutex<Vec<(String, serde_json::Value, String)>>,
}

impl RecordingJournal {
    pub fn entries(&self) -> Vec<(String, serde_json::Value, String)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandJournal for RecordingJournal {
    async fn record(&self, command: &Command, issuer: &Identity) -> anyhow::Result<()> {
        self.entries.lock().unwrap().push((
            command.action().to_string(),
            command.value(),
            issuer.username.clone(),
        ));
        Ok(())
    }
}

#[derive(Clone)]
enum Behaviour {
    Online(DeviceSnapshot),
    Down,
    Hang,
    Panic,
}

pub struct FakeDevice {
    behaviour: Mutex<Behaviour>,
    commands: Mutex<Vec<(String, serde_json::Value)>>,
    status_calls: AtomicUsize,
}

impl FakeDevice {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour: Mutex::new(behaviour),
            commands: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn online() -> Self {
        Self::with_status(serde_json::json!({ "modo": "auto", "brillo": 128, "lux": 300 }))
    }

    pub fn with_status(snapshot: DeviceSnapshot) -> Self {
        Self::with(Behaviour::Online(snapshot))
    }

    pub fn down() -> Self {
        Self::with(Behaviour::Down)
    }

    pub fn hanging() -> Self {
        Self::with(Behaviour::Hang)
    }

    pub fn panicking() -> Self {
        Self::with(Behaviour::Panic)
    }

    pub fn set_status(&self, snapshot: DeviceSnapshot) {
        *self.behaviour.lock().unwrap() = Behaviour::Online(snapshot);
    }

    pub fn commands(&self) -> Vec<(String, serde_json::Value)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn behaviour(&self) -> Behaviour {
        self.behaviour.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceApi for FakeDevice {
    fn address(&self) -> &str {
        "192.168.1.100"
    }

    async fn get_status(&self, _timeout: Duration) -> Result<DeviceSnapshot, DeviceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour() {
            Behaviour::Online(snapshot) => Ok(snapshot),
            Behaviour::Down => Err(DeviceError::Unavailable("connection refused".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DeviceError::Timeout)
            }
            Behaviour::Panic => panic!("device driver bug"),
        }
    }

    async fn send_command(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<serde_json::Value, DeviceError> {
        match self.behaviour() {
            Behaviour::Online(_) => {
                self.commands
                    .lock()
                    .unwrap()
                    .push((endpoint.to_string(), payload.clone()));
                Ok(serde_json::json!({ "ok": true, "applied": payload }))
            }
            _ => Err(DeviceError::Unavailable("connection refused".to_string())),
        }
    }
}

// ============================================================================
// Application
// ============================================================================

pub fn test_state(device: Arc<dyn DeviceApi>) -> AppState {
    let config = Config {
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            ..AuthConfig::default()
        },
        ..Config::default()
    };
    let users = StaticUsers::new()
        .with_user("u-alice", true)
        .with_user("u-admin", true)
        .with_user("u-bob", false);

    AppState::new(
        &config,
        device,
        Arc::new(users),
        Arc::new(RecordingJournal::default()),
    )
}

/// Serve the full router on an ephemeral loopback port
pub async fn serve(state: AppState) -> SocketAddr {
    let app = crate::api::routes(state.clone()).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
