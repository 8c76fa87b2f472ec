use thiserror::Error;
use tracing::warn;

use picomon_core::{clamp_display_text, should_log, LedButton, StatusSample};
use picomon_device::{DeviceApi, DeviceError};

use crate::store::{HistoryStore, LogRecord};

/// Outcome of one dashboard poll: the live sample plus whether it was
/// persisted on this pass.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub sample: StatusSample,
    pub logged: bool,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("unknown command {0}")]
    UnknownCommand(i64),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Ties the device client and the reading log together behind the dashboard
/// actions.
#[derive(Clone)]
pub struct DashboardService<D> {
    device: D,
    store: HistoryStore,
    log_interval_secs: i64,
}

impl<D: DeviceApi> DashboardService<D> {
    pub fn new(device: D, store: HistoryStore, log_interval_secs: i64) -> Self {
        Self {
            device,
            store,
            log_interval_secs,
        }
    }

    /// Polls the device and persists the sample when the log interval has
    /// elapsed. Storage trouble downgrades to a warning; the caller still
    /// gets the live sample.
    pub async fn read(&self) -> Result<ReadOutcome, DeviceError> {
        let sample = self.device.get_status().await?;
        let logged = self.maybe_log(&sample).await;
        Ok(ReadOutcome { sample, logged })
    }

    // Check-then-insert; a concurrent poll can slip one extra row inside the
    // interval, which only makes the log slightly denser.
    async fn maybe_log(&self, sample: &StatusSample) -> bool {
        let last = match self.store.last_sample_time().await {
            Ok(last) => last,
            Err(e) => {
                warn!(error = ?e, "could not read last log time; skipping persist");
                return false;
            }
        };
        if !should_log(last, sample.timestamp, self.log_interval_secs) {
            return false;
        }
        match self.store.append(sample).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = ?e, "could not persist reading");
                false
            }
        }
    }

    pub async fn history(&self, limit: u32) -> anyhow::Result<Vec<LogRecord>> {
        self.store.recent(limit).await
    }

    /// Validates a button command and pushes the matching LED byte.
    pub async fn send_led(&self, cmd: i64) -> Result<u8, SendError> {
        let button = LedButton::from_cmd(cmd).ok_or(SendError::UnknownCommand(cmd))?;
        let mask = button.mask();
        self.device.send_led(mask).await?;
        Ok(mask)
    }

    /// Clamps the line to the display width and pushes it. Returns the text
    /// actually sent.
    pub async fn send_text(&self, text: &str) -> Result<String, DeviceError> {
        let line = clamp_display_text(text);
        self.device.send_text(&line).await?;
        Ok(line)
    }

    /// LED byte for the button glow poll. An unreachable device reads as
    /// all-off so the page keeps rendering.
    pub async fn led_state(&self) -> u8 {
        match self.device.get_status().await {
            Ok(sample) => sample.led,
            Err(e) => {
                warn!(error = %e, "led poll failed; reporting all off");
                0
            }
        }
    }
}
