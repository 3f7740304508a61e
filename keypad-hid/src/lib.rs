//! Abstract HID output devices for the lemon keypad
//!
//! The keypad core talks to three independent capability surfaces:
//!
//! - [`KeyboardOutput`]: press/release by usage code, release-all
//! - [`MouseOutput`]: press/release by button mask, relative move
//! - [`ConsumerOutput`]: press/release a single consumer usage
//!
//! Any of them may be missing at any time (USB not enumerated yet, cable
//! pulled). A [`DeviceProvider`] knows how to (re)open them; the keypad
//! polls it and lazily recreates handles after a disconnect.
//!
//! ```text
//! [HidBus]  ← raw report endpoints, found by usage page / usage
//!     |
//! [BusProvider] → KeyboardReport / MouseReport / ConsumerReport
//!     |
//! [lemon-keypad dispatcher]
//! ```

pub mod codes;
pub mod endpoint;
pub mod error;
pub mod layout;
pub mod recorder;
pub mod report;

pub use endpoint::{BusProvider, HidBus, ReportSink, TraceBus};
pub use error::HidError;
pub use layout::write_text;
pub use recorder::{OutputEvent, Recorder, RecorderProvider};
pub use report::{ConsumerReport, KeyboardReport, MouseReport};

/// Keyboard capability surface
pub trait KeyboardOutput: Send {
    /// Press a key (modifier codes 0xE0-0xE7 included)
    fn press(&mut self, code: u8) -> Result<(), HidError>;

    /// Release a key; releasing a key that is not down is not an error
    fn release(&mut self, code: u8) -> Result<(), HidError>;

    /// Release every key and modifier
    fn release_all(&mut self) -> Result<(), HidError>;
}

/// Mouse capability surface
pub trait MouseOutput: Send {
    /// Press the buttons in `buttons` (bitmask, see [`codes::mouse`])
    fn press(&mut self, buttons: u8) -> Result<(), HidError>;

    /// Release the buttons in `buttons`
    fn release(&mut self, buttons: u8) -> Result<(), HidError>;

    /// Release every button
    fn release_all(&mut self) -> Result<(), HidError>;

    /// Relative pointer/wheel movement
    fn move_by(&mut self, x: i8, y: i8, wheel: i8) -> Result<(), HidError>;
}

/// Consumer control capability surface
///
/// Only one consumer usage can be down at a time; pressing a second one
/// replaces the first.
pub trait ConsumerOutput: Send {
    fn press(&mut self, code: u16) -> Result<(), HidError>;

    fn release(&mut self) -> Result<(), HidError>;
}

/// Source of output device handles
///
/// Polled by the keypad's device maintenance pass. Opening may fail while
/// the host is still enumerating; callers retry on the next pass.
pub trait DeviceProvider: Send {
    /// Whether the USB link is up at all
    fn is_connected(&self) -> bool;

    fn open_keyboard(&mut self) -> Result<Box<dyn KeyboardOutput>, HidError>;

    fn open_mouse(&mut self) -> Result<Box<dyn MouseOutput>, HidError>;

    fn open_consumer(&mut self) -> Result<Box<dyn ConsumerOutput>, HidError>;
}
