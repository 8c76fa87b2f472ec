use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use picomon_core::{StatusPayload, StatusSample};

use crate::config::DeviceConfig;

/// Failures talking to the device.
///
/// `Unreachable` covers transport problems (refused, DNS, timeout) where no
/// usable body arrived. `Malformed` means the device answered but the body
/// matched neither status wire format.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("malformed device response: {0}")]
    Malformed(String),
}

/// The device surface the dashboard consumes. Implemented by [`DeviceClient`]
/// for real hardware and by the scripted mocks in tests.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Fetch and decode the current status snapshot.
    async fn get_status(&self) -> Result<StatusSample, DeviceError>;

    /// Push an absolute LED state byte. The device adopts the byte as-is.
    async fn send_led(&self, mask: u8) -> Result<(), DeviceError>;

    /// Push a line of display text. Callers clamp length before sending.
    async fn send_text(&self, text: &str) -> Result<(), DeviceError>;
}

/// HTTP client for the device API. Cheap to clone; all clones share one
/// connection pool with a bounded per-request timeout.
#[derive(Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    pub fn new(config: &DeviceConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl DeviceApi for DeviceClient {
    async fn get_status(&self) -> Result<StatusSample, DeviceError> {
        let url = self.url("/api/status");
        debug!(%url, "polling device status");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;

        let payload =
            StatusPayload::parse(&body).map_err(|e| DeviceError::Malformed(e.to_string()))?;
        Ok(StatusSample::from_payload(&payload, Utc::now()))
    }

    async fn send_led(&self, mask: u8) -> Result<(), DeviceError> {
        let url = self.url("/api/control");
        debug!(%url, mask, "sending led state byte");

        self.http
            .post(&url)
            .json(&json!({ "led": mask }))
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), DeviceError> {
        let url = self.url("/api/text");
        debug!(%url, len = text.len(), "sending display text");

        self.http
            .post(&url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;
        Ok(())
    }
}
