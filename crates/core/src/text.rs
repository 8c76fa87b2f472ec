/// Capacity of the device's 16x2 OLED: two lines of 16 characters.
pub const MAX_DISPLAY_TEXT: usize = 32;

/// Clamp text to the display capacity. Counts characters, not bytes.
pub fn clamp_display_text(text: &str) -> String {
    text.chars().take(MAX_DISPLAY_TEXT).collect()
}
