//! Scripted device stand-ins for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use picomon_core::StatusSample;

use crate::client::{DeviceApi, DeviceError};

/// Pops one canned status result per poll and records every LED byte and
/// text line sent. Clones share the same script and recordings.
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    statuses: Mutex<VecDeque<Result<StatusSample, DeviceError>>>,
    sent_leds: Mutex<Vec<u8>>,
    sent_texts: Mutex<Vec<String>>,
    send_failure: Mutex<Option<DeviceError>>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful status reply.
    pub fn push_status(&self, sample: StatusSample) {
        self.inner.statuses.lock().unwrap().push_back(Ok(sample));
    }

    /// Queue a failed status reply.
    pub fn push_error(&self, err: DeviceError) {
        self.inner.statuses.lock().unwrap().push_back(Err(err));
    }

    /// Make every subsequent send fail with `err`.
    pub fn fail_sends(&self, err: DeviceError) {
        *self.inner.send_failure.lock().unwrap() = Some(err);
    }

    pub fn sent_leds(&self) -> Vec<u8> {
        self.inner.sent_leds.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.inner.sent_texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceApi for ScriptedDevice {
    async fn get_status(&self) -> Result<StatusSample, DeviceError> {
        self.inner
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DeviceError::Unreachable("script exhausted".to_string())))
    }

    async fn send_led(&self, mask: u8) -> Result<(), DeviceError> {
        if let Some(err) = self.inner.send_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.inner.sent_leds.lock().unwrap().push(mask);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), DeviceError> {
        if let Some(err) = self.inner.send_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.inner.sent_texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
