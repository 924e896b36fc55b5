//! Command router - validates operator commands and forwards them to the device
//!
//! Validation happens before any device call. A command is announced to the
//! real-time clients only after the device accepted it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::device::DeviceApi;
use crate::error::{AppError, ValidationError};
use crate::models::{Command, Identity, Mode};
use crate::realtime::{BroadcastEvent, Broadcaster};

/// Audit trail for forwarded commands
#[async_trait]
pub trait CommandJournal: Send + Sync {
    async fn record(&self, command: &Command, issuer: &Identity) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ModeChange,
    BrightnessChange,
}

pub struct CommandRouter {
    device: Arc<dyn DeviceApi>,
    broadcaster: Arc<Broadcaster>,
    journal: Arc<dyn CommandJournal>,
    timeout: Duration,
}

impl CommandRouter {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        broadcaster: Arc<Broadcaster>,
        journal: Arc<dyn CommandJournal>,
        timeout: Duration,
    ) -> Self {
        Self {
            device,
            broadcaster,
            journal,
            timeout,
        }
    }

    /// Validate `payload` for `kind` and execute it on behalf of `issuer`
    pub async fn handle(
        &self,
        kind: CommandKind,
        payload: Option<&serde_json::Value>,
        issuer: &Identity,
    ) -> Result<serde_json::Value, AppError> {
        let command = match kind {
            CommandKind::ModeChange => Command::SetMode(validate_mode(payload)?),
            CommandKind::BrightnessChange => Command::SetBrightness(validate_brightness(payload)?),
        };
        self.execute(command, issuer).await
    }

    pub async fn execute(
        &self,
        command: Command,
        issuer: &Identity,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .device
            .send_command(command.endpoint(), &command.device_payload(), self.timeout)
            .await
            .map_err(AppError::DeviceCommand)?;

        tracing::info!(
            "{} applied by {}: {}",
            command.action(),
            issuer.username,
            command.value()
        );

        let event = match &command {
            Command::SetMode(mode) => BroadcastEvent::ModeChanged {
                mode: *mode,
                user: issuer.username.clone(),
            },
            Command::SetBrightness(level) => BroadcastEvent::BrightnessChanged {
                brightness: *level,
                user: issuer.username.clone(),
            },
        };
        self.broadcaster.publish(&event).await;

        let journal = self.journal.clone();
        let issuer = issuer.clone();
        tokio::spawn(async move {
            if let Err(e) = journal.record(&command, &issuer).await {
                tracing::warn!("Failed to journal {}: {}", command.action(), e);
            }
        });

        Ok(response)
    }
}

/// Accepts exactly `"auto"` or `"manual"`
pub fn validate_mode(value: Option<&serde_json::Value>) -> Result<Mode, ValidationError> {
    match value.and_then(|v| v.as_str()) {
        Some("auto") => Ok(Mode::Auto),
        Some("manual") => Ok(Mode::Manual),
        _ => Err(ValidationError::InvalidMode),
    }
}

/// Accepts a JSON integer in `0..=255`; floats, strings and booleans are rejected
pub fn validate_brightness(value: Option<&serde_json::Value>) -> Result<u8, ValidationError> {
    value
        .and_then(|v| v.as_u64())
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(ValidationError::InvalidBrightnessRange)
}
