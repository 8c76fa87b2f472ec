pub mod led;
pub mod status;
pub mod text;
pub mod throttle;

pub use led::LedButton;
pub use status::{DecodeError, StatusPayload, StatusSample};
pub use text::{clamp_display_text, MAX_DISPLAY_TEXT};
pub use throttle::{should_log, DEFAULT_LOG_INTERVAL_SECS};
