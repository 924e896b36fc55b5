//! Device proxy - outbound calls to the ESP32 lighting controller

mod client;

pub use self::client::DeviceClient;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DeviceError;

/// Latest status payload reported by the controller, passed through as-is
pub type DeviceSnapshot = serde_json::Value;

/// Operations the gateway needs from the device. No retries: callers decide
/// whether a failure is terminal or tolerated.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Address shown to clients (host or host:port)
    fn address(&self) -> &str;

    async fn get_status(&self, timeout: Duration) -> Result<DeviceSnapshot, DeviceError>;

    async fn send_command(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, DeviceError>;
}
