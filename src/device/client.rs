//! HTTP client for the ESP32 REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{DeviceApi, DeviceSnapshot};
use crate::error::DeviceError;

const STATUS_PATH: &str = "/api/status";

pub struct DeviceClient {
    http_client: Client,
    base_url: Url,
    address: String,
}

impl DeviceClient {
    /// Accepts a bare host (`192.168.1.100`), `host:port`, or a full URL
    pub fn new(address: &str) -> anyhow::Result<Self> {
        let base_url = parse_base_url(address)?;

        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            address: address.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> Result<Url, DeviceError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| DeviceError::Unavailable(format!("invalid endpoint {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl DeviceApi for DeviceClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn get_status(&self, timeout: Duration) -> Result<DeviceSnapshot, DeviceError> {
        let response = self
            .http_client
            .get(self.url(STATUS_PATH)?)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        read_json(response).await
    }

    async fn send_command(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, DeviceError> {
        let response = self
            .http_client
            .post(self.url(endpoint)?)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        read_json(response).await
    }
}

fn parse_base_url(address: &str) -> anyhow::Result<Url> {
    let raw = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let url = Url::parse(&raw)?;
    if url.host_str().is_none() {
        anyhow::bail!("Device address has no host: {}", address);
    }
    Ok(url)
}

fn map_transport_error(e: reqwest::Error) -> DeviceError {
    if e.is_timeout() {
        DeviceError::Timeout
    } else if e.is_connect() {
        DeviceError::Unavailable(format!("connection_failed: {}", e))
    } else {
        DeviceError::Unavailable(e.to_string())
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, DeviceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(DeviceError::Unavailable(format!(
            "device responded with HTTP {}",
            status.as_u16()
        )));
    }

    response.json::<serde_json::Value>().await.map_err(|e| {
        if e.is_timeout() {
            DeviceError::Timeout
        } else {
            DeviceError::Unavailable(format!("invalid device response: {}", e))
        }
    })
}
