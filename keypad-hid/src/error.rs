//! HID output error types

use thiserror::Error;

/// Errors from output device operations
#[derive(Error, Debug)]
pub enum HidError {
    /// USB is up but the host has not finished enumerating us yet
    #[error("Device not ready")]
    NotReady,

    /// USB cable unplugged or host went away
    #[error("Device disconnected")]
    Disconnected,

    /// No HID interface with the requested usage was exposed
    #[error("No HID endpoint with usage page 0x{usage_page:02X}, usage 0x{usage:02X}")]
    EndpointNotFound { usage_page: u16, usage: u16 },

    /// Boot keyboard reports only carry six non-modifier keys
    #[error("Trying to press more than six keys at once")]
    TooManyKeys,

    /// Character has no key on the US layout
    #[error("No keycode for character {0:?}")]
    UnsupportedChar(char),

    /// Report write failed
    #[error("Report write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl HidError {
    /// Whether the error means "try again after the next device poll"
    /// rather than a bad request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            HidError::NotReady | HidError::Disconnected | HidError::EndpointNotFound { .. }
        )
    }
}
