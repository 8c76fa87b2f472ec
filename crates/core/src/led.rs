// LED button table and mask helpers matching the Pico firmware.
//
// The control protocol is set-absolute: the byte sent replaces the device's
// whole LED register rather than setting or clearing single bits. A caller
// that wants "toggle one LED" has to track the desired mask and resend it.

use serde::{Deserialize, Serialize};

/// One dashboard button. Each button owns a single bit of the 8-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedButton {
    Blue,
    Red,
    Yellow,
    Green,
}

impl LedButton {
    pub const ALL: [LedButton; 4] = [
        LedButton::Blue,
        LedButton::Red,
        LedButton::Yellow,
        LedButton::Green,
    ];

    /// Wire byte for this button.
    pub fn mask(self) -> u8 {
        match self {
            LedButton::Blue => 0x08,
            LedButton::Red => 0x04,
            LedButton::Yellow => 0x02,
            LedButton::Green => 0x01,
        }
    }

    /// Resolve a dashboard command id to a button. Command ids are the button
    /// bytes themselves; anything outside the table is rejected.
    pub fn from_cmd(cmd: i64) -> Option<LedButton> {
        match cmd {
            0x08 => Some(LedButton::Blue),
            0x04 => Some(LedButton::Red),
            0x02 => Some(LedButton::Yellow),
            0x01 => Some(LedButton::Green),
            _ => None,
        }
    }

    /// Whether this button's indicator is lit under `mask`.
    pub fn is_lit(self, mask: u8) -> bool {
        mask & self.mask() != 0
    }
}
