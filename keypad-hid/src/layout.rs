//! Typing text on a US keyboard layout

use crate::codes::{char_to_hid, key};
use crate::error::HidError;
use crate::KeyboardOutput;

/// Type `text` one keystroke at a time.
///
/// Each character is pressed (with Left Shift when the US layout needs it)
/// and then every key is released. Stops at the first character the layout
/// cannot produce or the first device error; characters before it have
/// already been typed.
pub fn write_text(keyboard: &mut dyn KeyboardOutput, text: &str) -> Result<(), HidError> {
    for ch in text.chars() {
        let (code, shift) = char_to_hid(ch).ok_or(HidError::UnsupportedChar(ch))?;
        if shift {
            keyboard.press(key::LEFT_SHIFT)?;
        }
        keyboard.press(code)?;
        keyboard.release_all()?;
    }
    Ok(())
}
