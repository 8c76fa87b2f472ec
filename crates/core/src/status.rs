// Status payload decoding across the two wire format generations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A device reply that parses as neither wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed status payload: {0}")]
pub struct DecodeError(pub String);

/// One `/api/status` reply.
///
/// Newer firmware reports the LED mask and the raw temperature sample as
/// separate fields; older firmware packs both into a single 24-bit register.
/// Variant order makes the split fields win whenever they are present, so the
/// legacy unpacking is only a fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusPayload {
    Split {
        #[serde(alias = "ledState", alias = "led_state")]
        led: u8,
        #[serde(default, alias = "temp_raw")]
        raw: Option<i64>,
        #[serde(default)]
        temperature: Option<f64>,
    },
    /// Bits 16..24 hold the LED mask, bits 0..16 the raw temperature sample.
    Packed { value: u32 },
}

impl StatusPayload {
    pub fn parse(body: &[u8]) -> Result<StatusPayload, DecodeError> {
        serde_json::from_slice(body).map_err(|e| DecodeError(e.to_string()))
    }

    pub fn led_mask(&self) -> u8 {
        match self {
            StatusPayload::Split { led, .. } => *led,
            StatusPayload::Packed { value } => ((value >> 16) & 0xFF) as u8,
        }
    }

    pub fn raw_temp(&self) -> Option<i64> {
        match self {
            StatusPayload::Split { raw, .. } => *raw,
            StatusPayload::Packed { value } => Some((value & 0xFFFF) as i64),
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        match self {
            StatusPayload::Split { temperature, .. } => *temperature,
            StatusPayload::Packed { .. } => None,
        }
    }
}

/// A normalized device reading: raw ADC sample, converted temperature, LED
/// mask, and the time the server observed it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSample {
    pub raw: i64,
    pub temperature: f64,
    pub led: u8,
    pub timestamp: DateTime<Utc>,
}

impl StatusSample {
    /// Normalize a decoded payload, stamping the observation time. A
    /// packed-only reply carries no float temperature, so the raw 16-bit
    /// sample stands in for the reading there.
    pub fn from_payload(payload: &StatusPayload, timestamp: DateTime<Utc>) -> StatusSample {
        let raw = payload.raw_temp().unwrap_or(0);
        StatusSample {
            raw,
            temperature: payload.temperature().unwrap_or(raw as f64),
            led: payload.led_mask(),
            timestamp,
        }
    }
}
