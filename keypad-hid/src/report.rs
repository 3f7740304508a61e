//! HID report builders
//!
//! Each builder owns the current report bytes and writes the whole report
//! to its [`ReportSink`] after every change.
//!
//! Report layouts:
//!
//! ```text
//! keyboard  [modifiers, reserved, k0, k1, k2, k3, k4, k5]
//! mouse     [buttons, x, y, wheel]
//! consumer  [usage_lo, usage_hi]
//! ```

use crate::codes::key;
use crate::endpoint::ReportSink;
use crate::error::HidError;
use crate::{ConsumerOutput, KeyboardOutput, MouseOutput};

/// Number of non-modifier key slots in a boot keyboard report
pub const KEY_SLOTS: usize = 6;

/// Keyboard report state
pub struct KeyboardReport<S> {
    sink: S,
    report: [u8; 8],
}

impl<S: ReportSink> KeyboardReport<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            report: [0; 8],
        }
    }

    /// Current report bytes
    pub fn report(&self) -> &[u8; 8] {
        &self.report
    }

    fn send(&mut self) -> Result<(), HidError> {
        self.sink.send_report(&self.report)
    }

    fn add_key(&mut self, code: u8) -> Result<(), HidError> {
        if key::is_modifier(code) {
            self.report[0] |= key::modifier_bit(code);
            return Ok(());
        }
        let slots = &mut self.report[2..];
        if slots.contains(&code) {
            return Ok(());
        }
        match slots.iter_mut().find(|slot| **slot == 0) {
            Some(slot) => {
                *slot = code;
                Ok(())
            }
            None => Err(HidError::TooManyKeys),
        }
    }

    fn remove_key(&mut self, code: u8) {
        if key::is_modifier(code) {
            self.report[0] &= !key::modifier_bit(code);
            return;
        }
        for slot in self.report[2..].iter_mut() {
            if *slot == code {
                *slot = 0;
            }
        }
    }
}

impl<S: ReportSink> KeyboardOutput for KeyboardReport<S> {
    fn press(&mut self, code: u8) -> Result<(), HidError> {
        self.add_key(code)?;
        self.send()
    }

    fn release(&mut self, code: u8) -> Result<(), HidError> {
        self.remove_key(code);
        self.send()
    }

    fn release_all(&mut self) -> Result<(), HidError> {
        self.report = [0; 8];
        self.send()
    }
}

/// Mouse report state
pub struct MouseReport<S> {
    sink: S,
    buttons: u8,
}

impl<S: ReportSink> MouseReport<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, buttons: 0 }
    }

    /// Buttons currently held
    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    fn send(&mut self, x: i8, y: i8, wheel: i8) -> Result<(), HidError> {
        let report = [self.buttons, x as u8, y as u8, wheel as u8];
        self.sink.send_report(&report)
    }
}

impl<S: ReportSink> MouseOutput for MouseReport<S> {
    fn press(&mut self, buttons: u8) -> Result<(), HidError> {
        self.buttons |= buttons;
        self.send(0, 0, 0)
    }

    fn release(&mut self, buttons: u8) -> Result<(), HidError> {
        self.buttons &= !buttons;
        self.send(0, 0, 0)
    }

    fn release_all(&mut self) -> Result<(), HidError> {
        self.buttons = 0;
        self.send(0, 0, 0)
    }

    fn move_by(&mut self, x: i8, y: i8, wheel: i8) -> Result<(), HidError> {
        self.send(x, y, wheel)
    }
}

/// Consumer control report state
pub struct ConsumerReport<S> {
    sink: S,
}

impl<S: ReportSink> ConsumerReport<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: ReportSink> ConsumerOutput for ConsumerReport<S> {
    fn press(&mut self, code: u16) -> Result<(), HidError> {
        self.sink.send_report(&code.to_le_bytes())
    }

    fn release(&mut self) -> Result<(), HidError> {
        self.sink.send_report(&[0, 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{consumer, mouse};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Sink that keeps every report written to it
    #[derive(Clone, Default)]
    struct CaptureSink(Arc<Mutex<Vec<Vec<u8>>>>);

    impl ReportSink for CaptureSink {
        fn send_report(&mut self, report: &[u8]) -> Result<(), HidError> {
            self.0.lock().push(report.to_vec());
            Ok(())
        }
    }

    impl CaptureSink {
        fn last(&self) -> Vec<u8> {
            self.0.lock().last().cloned().unwrap_or_default()
        }
    }

    #[test]
    fn keyboard_press_fills_slots_and_modifiers() {
        let sink = CaptureSink::default();
        let mut kb = KeyboardReport::new(sink.clone());
        kb.press(key::LEFT_CONTROL).unwrap();
        kb.press(key::C).unwrap();
        assert_eq!(sink.last(), vec![0x01, 0, key::C, 0, 0, 0, 0, 0]);

        kb.release(key::C).unwrap();
        assert_eq!(sink.last(), vec![0x01, 0, 0, 0, 0, 0, 0, 0]);

        kb.release_all().unwrap();
        assert_eq!(sink.last(), vec![0; 8]);
    }

    #[test]
    fn keyboard_rejects_seventh_key() {
        let mut kb = KeyboardReport::new(CaptureSink::default());
        for code in 0x04..0x0A {
            kb.press(code).unwrap();
        }
        assert!(matches!(kb.press(0x0A), Err(HidError::TooManyKeys)));
        // Pressing an already-held key is fine
        kb.press(0x04).unwrap();
    }

    #[test]
    fn mouse_buttons_accumulate() {
        let sink = CaptureSink::default();
        let mut m = MouseReport::new(sink.clone());
        m.press(mouse::LEFT).unwrap();
        m.press(mouse::RIGHT).unwrap();
        assert_eq!(m.buttons(), mouse::LEFT | mouse::RIGHT);
        m.move_by(-3, 4, 1).unwrap();
        assert_eq!(sink.last(), vec![0x03, 0xFD, 0x04, 0x01]);
        m.release(mouse::LEFT).unwrap();
        assert_eq!(sink.last(), vec![0x02, 0, 0, 0]);
    }

    #[test]
    fn consumer_report_is_little_endian() {
        let sink = CaptureSink::default();
        let mut cc = ConsumerReport::new(sink.clone());
        cc.press(consumer::BRIGHTNESS_UP).unwrap();
        assert_eq!(sink.last(), vec![0x6F, 0x00]);
        cc.release().unwrap();
        assert_eq!(sink.last(), vec![0, 0]);
    }
}
